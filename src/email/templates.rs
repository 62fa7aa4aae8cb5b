use serde::Serialize;
use tera::{Context, Tera};

use crate::config::EmailConfig;
use crate::domain::document_list::DocumentDefinition;

use super::{EmailError, LoginCredentials, RequestSummary};

const HTML_TEMPLATE: &str = "request_email.html";
const TEXT_TEMPLATE: &str = "request_email.txt";
const DEFAULT_LIST_NAME: &str = "Documents requis";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Serialize)]
struct TemplateDocument<'a> {
    name: &'a str,
    description: Option<&'a str>,
    required: bool,
}

impl<'a> From<&'a DocumentDefinition> for TemplateDocument<'a> {
    fn from(document: &'a DocumentDefinition) -> Self {
        Self {
            name: &document.name,
            description: document.description.as_deref().filter(|d| !d.is_empty()),
            required: document.required,
        }
    }
}

/// Renders the request email. The HTML template is autoescaped, the text one is not.
#[derive(Clone)]
pub struct EmailRenderer {
    tera: Tera,
    app_name: String,
    login_url: String,
    support_email: String,
}

impl EmailRenderer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                HTML_TEMPLATE,
                include_str!("../../templates/request_email.html"),
            ),
            (
                TEXT_TEMPLATE,
                include_str!("../../templates/request_email.txt"),
            ),
        ])
        .map_err(|err| EmailError::Template(err.to_string()))?;

        Ok(Self {
            tera,
            app_name: config.app_name.clone(),
            login_url: config.client_login_url.clone(),
            support_email: config.support_email.clone(),
        })
    }

    pub fn subject(request: &RequestSummary) -> String {
        format!("Demande de documents - {}", list_name(request))
    }

    pub fn render(
        &self,
        request: &RequestSummary,
        credentials: &LoginCredentials,
        custom_message: Option<&str>,
    ) -> Result<RenderedEmail, EmailError> {
        let documents: Vec<TemplateDocument<'_>> = request
            .requested_documents
            .iter()
            .map(TemplateDocument::from)
            .collect();

        let mut context = Context::new();
        context.insert("app_name", &self.app_name);
        context.insert("login_url", &self.login_url);
        context.insert("support_email", &self.support_email);
        context.insert("client_name", &request.client_name);
        context.insert("list_name", list_name(request));
        context.insert(
            "custom_message",
            &custom_message.map(str::trim).filter(|m| !m.is_empty()),
        );
        context.insert("login_email", &credentials.email);
        context.insert("password", &credentials.password);
        context.insert("documents", &documents);

        let html = self
            .tera
            .render(HTML_TEMPLATE, &context)
            .map_err(|err| EmailError::Template(err.to_string()))?;
        let text = self
            .tera
            .render(TEXT_TEMPLATE, &context)
            .map_err(|err| EmailError::Template(err.to_string()))?;

        Ok(RenderedEmail {
            subject: Self::subject(request),
            html,
            text: text.trim().to_string(),
        })
    }
}

fn list_name(request: &RequestSummary) -> &str {
    request
        .document_list_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_LIST_NAME)
}
