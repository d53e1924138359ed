//! A minimal template language.
//!
//! | Syntax                         | Output                                   |
//! |--------------------------------|------------------------------------------|
//! | `{{ this.<field> }}`           | field of the rendered record             |
//! | `{{ this.url }}` / `path`/`alt`/`slug` | record metadata                  |
//! | `{{ page.number }}` / `total`  | pagination position (1/1 if unpaged)     |
//! | `{{ config.<dotted.key> }}`    | project config value                     |
//! | `{{ get("/path").<field> }}`   | field (or `url`) of another source       |
//! | `{{ children }}`               | `<ul>` of (page) children                |
//! | `{% include "name" %}`         | another template, inlined                |
//!
//! Values are HTML-escaped unless followed by `| raw`. Missing fields
//! render as empty strings; unknown expressions are errors.

use std::sync::LazyLock;

use regex::Regex;

use crate::content::SourceObject;
use crate::utils::html::escape;

use super::{RenderContext, RenderError, Renderer};

/// Nested includes deeper than this are treated as a cycle.
const MAX_INCLUDE_DEPTH: usize = 8;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}|\{%(.*?)%\}").unwrap());

static INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^include[ \t]+"([^"]+)"$"#).unwrap());

static GET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^get\("([^"]*)"\)\.([A-Za-z0-9_-]+)$"#).unwrap());

#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleRenderer;

impl Renderer for SimpleRenderer {
    fn render(&self, template_id: &str, ctx: &mut RenderContext<'_>) -> Result<Vec<u8>, RenderError> {
        let text = ctx.read_template(template_id)?;
        self.render_text(template_id, &text, ctx, 0)
            .map(String::into_bytes)
    }
}

impl SimpleRenderer {
    fn render_text(
        &self,
        template_id: &str,
        text: &str,
        ctx: &mut RenderContext<'_>,
        depth: usize,
    ) -> Result<String, RenderError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in TAG.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            if let Some(expr) = caps.get(1) {
                out.push_str(&self.expression(template_id, expr.as_str().trim(), ctx)?);
            } else if let Some(stmt) = caps.get(2) {
                out.push_str(&self.statement(template_id, stmt.as_str().trim(), ctx, depth)?);
            }
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn statement(
        &self,
        template_id: &str,
        stmt: &str,
        ctx: &mut RenderContext<'_>,
        depth: usize,
    ) -> Result<String, RenderError> {
        let Some(caps) = INCLUDE.captures(stmt) else {
            return Err(RenderError::new(template_id, format!("unknown statement `{stmt}`")));
        };
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(RenderError::new(
                template_id,
                format!("includes nested deeper than {MAX_INCLUDE_DEPTH}"),
            ));
        }
        let name = &caps[1];
        let text = ctx.read_template(name)?;
        self.render_text(name, &text, ctx, depth + 1)
    }

    fn expression(
        &self,
        template_id: &str,
        expr: &str,
        ctx: &mut RenderContext<'_>,
    ) -> Result<String, RenderError> {
        let (expr, raw) = match expr.strip_suffix("raw") {
            Some(rest) if rest.trim_end().ends_with('|') => {
                (rest.trim_end().trim_end_matches('|').trim_end(), true)
            }
            _ => (expr, false),
        };

        let value = self.evaluate(template_id, expr, ctx)?;
        Ok(if raw || expr == "children" {
            value
        } else {
            escape(&value)
        })
    }

    fn evaluate(
        &self,
        template_id: &str,
        expr: &str,
        ctx: &mut RenderContext<'_>,
    ) -> Result<String, RenderError> {
        let unknown = || RenderError::new(template_id, format!("unknown expression `{expr}`"));

        if expr == "children" {
            return Ok(children_list(ctx));
        }
        if let Some(caps) = GET.captures(expr) {
            if &caps[2] == "url" {
                return Ok(ctx.get(&caps[1]).map(|s| s.url().to_string()).unwrap_or_default());
            }
            let fields = ctx.fields(&caps[1]);
            return Ok(fields
                .and_then(|f| f.get(&caps[2]).map(str::to_string))
                .unwrap_or_default());
        }

        let Some((head, rest)) = expr.split_once('.') else {
            return Err(unknown());
        };
        match head {
            "this" => {
                let record = ctx.this().ok_or_else(unknown)?;
                Ok(match rest {
                    "url" => ctx.source().url().to_string(),
                    "path" => record.path.to_string(),
                    "alt" => record.alt.to_string(),
                    "slug" => record.slug.clone(),
                    field => record.field(field).unwrap_or_default().to_string(),
                })
            }
            "page" => {
                let (number, total) = match ctx.source() {
                    SourceObject::Page(page) => (page.number, page.total),
                    _ => (1, 1),
                };
                match rest {
                    "number" => Ok(number.to_string()),
                    "total" => Ok(total.to_string()),
                    _ => Err(unknown()),
                }
            }
            "config" => Ok(ctx.config(rest).map(display_value).unwrap_or_default()),
            _ => Err(unknown()),
        }
    }
}

fn children_list(ctx: &mut RenderContext<'_>) -> String {
    let children = ctx.page_children();
    let mut out = String::from("<ul>");
    for child in children {
        let title = child.field("title").unwrap_or(child.path.name());
        out.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>",
            escape(&child.url),
            escape(title)
        ));
    }
    out.push_str("</ul>");
    out
}

fn display_value(value: toml::Value) -> String {
    match value {
        toml::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::content::{LrParser, Pad};
    use crate::core::{Alt, ArtifactPath, RecordPath};
    use crate::deps::{DepKey, TrackingScope};
    use crate::resolve::GeneratorRegistry;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn project(templates: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(
            root.join("folio.toml"),
            "[project]\nname = \"Demo & Co\"\n[models.blog.pagination]\nenabled = true\nper_page = 1\n",
        )
        .unwrap();
        let files = [
            ("content/contents.lr", "title: Home\n---\nbody:\n\n<b>bold</b>"),
            ("content/about/contents.lr", "title: About us"),
            ("content/blog/contents.lr", "_model: blog\n---\ntitle: Blog"),
            ("content/blog/a/contents.lr", "title: A"),
            ("content/blog/b/contents.lr", "title: B"),
        ];
        for (rel, text) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        fs::create_dir_all(root.join("templates")).unwrap();
        for (name, text) in templates {
            fs::write(root.join("templates").join(name), text).unwrap();
        }
        dir
    }

    fn open(root: &Path) -> Pad {
        let config = Arc::new(ProjectConfig::load(root).unwrap());
        Pad::open(config, Arc::new(LrParser), Arc::new(GeneratorRegistry::new()))
    }

    fn render(pad: &Pad, path: &str, template: &str) -> (Result<String, RenderError>, Vec<DepKey>) {
        let alt = Alt::implicit();
        let source = pad.get(path, &alt).unwrap();
        let scope = TrackingScope::begin(ArtifactPath::from_url(source.url()));
        let mut ctx = RenderContext::new(pad, &source, alt, scope);
        let result = SimpleRenderer
            .render(template, &mut ctx)
            .map(|bytes| String::from_utf8(bytes).unwrap());
        let (scope, _) = ctx.finish();
        (result, scope.commit().keys().collect())
    }

    #[test]
    fn renders_fields_config_and_escaping() {
        let dir = project(&[(
            "page.html",
            "<h1>{{ this.title }}</h1>{{ this.body | raw }}|{{ this.body }}|{{ config.project.name }}|{{ this.url }}",
        )]);
        let pad = open(dir.path());

        let (html, deps) = render(&pad, "/", "page.html");
        assert_eq!(
            html.unwrap(),
            "<h1>Home</h1><b>bold</b>|&lt;b&gt;bold&lt;/b&gt;|Demo &amp; Co|/"
        );
        assert!(deps.contains(&DepKey::File("templates/page.html".to_string())));
        assert!(deps.contains(&DepKey::File("content/contents.lr".to_string())));
        assert!(deps.contains(&DepKey::Config("project.name".to_string())));
        assert!(deps.contains(&DepKey::Config("models.page".to_string())));
        // a page that lists nothing does not depend on its children
        assert!(!deps.contains(&DepKey::Children(RecordPath::root(), Alt::implicit())));
    }

    #[test]
    fn cross_record_lookup_is_tracked() {
        let dir = project(&[("page.html", "{{ get(\"/about\").title }}{{ get(\"/missing\").title }}")]);
        let pad = open(dir.path());

        let (html, deps) = render(&pad, "/", "page.html");
        assert_eq!(html.unwrap(), "About us");
        assert!(deps.contains(&DepKey::Record(RecordPath::new("/about"), Alt::implicit())));
        assert!(deps.contains(&DepKey::Children(RecordPath::root(), Alt::implicit())));
        assert!(deps.contains(&DepKey::File("content/missing".to_string())));
    }

    #[test]
    fn paginated_children_and_includes() {
        let dir = project(&[
            ("blog.html", "{% include \"header.html\" %}{{ page.number }}/{{ page.total }}{{ children }}"),
            ("header.html", "[{{ this.title }}]"),
        ]);
        let pad = open(dir.path());

        let (html, deps) = render(&pad, "/blog@2", "blog.html");
        assert_eq!(
            html.unwrap(),
            "[Blog]2/2<ul><li><a href=\"/blog/b/\">B</a></li></ul>"
        );
        assert!(deps.contains(&DepKey::File("templates/header.html".to_string())));
        assert!(deps.contains(&DepKey::Children(RecordPath::new("/blog"), Alt::implicit())));
    }

    #[test]
    fn errors_for_unknown_expressions_and_templates() {
        let dir = project(&[("page.html", "{{ nonsense }}"), ("loop.html", "{% include \"loop.html\" %}")]);
        let pad = open(dir.path());

        let (result, _) = render(&pad, "/about", "page.html");
        assert!(result.unwrap_err().cause.contains("unknown expression"));

        let (result, _) = render(&pad, "/about", "missing.html");
        assert_eq!(result.unwrap_err().template, "missing.html");

        let (result, _) = render(&pad, "/about", "loop.html");
        assert!(result.unwrap_err().cause.contains("nested deeper"));
    }
}
