//! Minimal TwiML messaging response.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

pub const TWIML_CONTENT_TYPE: &str = "application/xml";

/// A `<Response>` document holding `<Message>` elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagingResponse {
    messages: Vec<String>,
}

impl MessagingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `<Message>` with the given body.
    pub fn message(mut self, body: impl Into<String>) -> Self {
        self.messages.push(body.into());
        self
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for body in &self.messages {
            xml.push_str("<Message>");
            xml.push_str(&escape_xml(body));
            xml.push_str("</Message>");
        }
        xml.push_str("</Response>");
        xml
    }
}

impl IntoResponse for MessagingResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)],
            self.to_xml(),
        )
            .into_response()
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_has_no_message() {
        assert_eq!(
            MessagingResponse::new().to_xml(),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#
        );
    }

    #[test]
    fn message_body_is_wrapped() {
        let xml = MessagingResponse::new().message("¡Hola! 🍕\nMenu").to_xml();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>¡Hola! 🍕\nMenu</Message></Response>"
        );
    }

    #[test]
    fn special_characters_are_escaped() {
        assert_eq!(
            escape_xml(r#"Tom & Jerry's <"pizza">"#),
            "Tom &amp; Jerry&apos;s &lt;&quot;pizza&quot;&gt;"
        );
    }

    #[test]
    fn into_response_sets_xml_content_type() {
        let response = MessagingResponse::new().message("ok").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(TWIML_CONTENT_TYPE)
        );
    }
}
