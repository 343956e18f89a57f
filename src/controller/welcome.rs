use crate::config::{ConfigParameter, ConfigService};
use crate::controller::{Controller, HttpApp, RouteTable};
use crate::di::{Container, Injectable};
use crate::error::Result;
use axum::response::Html;
use std::fmt::Write;
use std::sync::Arc;

pub const TAG: &str = "info";

const DEFAULT_NAME: &str = "Nanoservice";
const DEFAULT_VERSION: &str = "0.1.0";

/// Landing page listing every route of the composed application.
pub struct WelcomeController {
    config: Arc<ConfigService>,
}

impl Injectable for WelcomeController {
    fn inject(container: &Container) -> Result<Self> {
        Ok(Self {
            config: container.resolve()?,
        })
    }
}

impl WelcomeController {
    fn setting(&self, param: ConfigParameter, default: &str) -> String {
        self.config
            .param_or(param, default.to_string())
            .unwrap_or_else(|_| default.to_string())
    }

    fn render(&self, routes: &RouteTable) -> Html<String> {
        let name = escape(&self.setting(ConfigParameter::AppName, DEFAULT_NAME));
        let version = escape(&self.setting(ConfigParameter::AppVersion, DEFAULT_VERSION));
        let description = escape(&self.setting(ConfigParameter::AppDescription, ""));

        let listing = routes
            .sorted()
            .iter()
            .map(|route| escape(&format!("{} {} - {}", route.method, route.path, route.summary)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut page = String::new();
        let _ = write!(
            page,
            r#"<!DOCTYPE html>
<html>
  <head>
    <title>{name} v{version}</title>
    <style>
      body {{ font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; }}
      .description {{ color: #666; margin: 10px 0 20px 0; }}
      .routes {{ background: #f5f5f5; padding: 15px; border-radius: 5px; }}
      pre {{ margin: 0; white-space: pre-wrap; }}
    </style>
  </head>
  <body>
    <h1>{name} <small>v{version}</small></h1>
"#
        );
        if !description.is_empty() {
            let _ = writeln!(page, r#"    <div class="description">{description}</div>"#);
        }
        let _ = write!(
            page,
            r#"    <h2>Available Routes</h2>
    <div class="routes"><pre>{listing}</pre></div>
  </body>
</html>
"#
        );
        Html(page)
    }
}

impl Controller for WelcomeController {
    fn register_routes(self: Arc<Self>, app: &mut HttpApp, prefix: &str) -> Result<()> {
        // The table is filled once the application is built; read it per request.
        let routes = app.route_table();
        app.get(format!("{prefix}/"), "Welcome Page", TAG, move || {
            let this = self.clone();
            let routes = routes.clone();
            async move { this.render(&routes) }
        })?;
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
