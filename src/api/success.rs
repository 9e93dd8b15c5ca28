use actix_web::{body::BoxBody, http::StatusCode, HttpRequest, HttpResponse, Responder};
use std::borrow::Cow;

/// JSON envelope shared by every endpoint: `{ "data": ..., "message": ... }`.
#[derive(serde::Serialize)]
pub struct SuccessData<T> {
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Cow<'static, str>>,
}

pub struct Success<T: serde::Serialize> {
    pub status: StatusCode,
    pub body: Option<SuccessData<T>>,
}

impl<T: serde::Serialize> Success<T> {
    fn with_status(status: StatusCode, data: Option<T>) -> Self {
        Self { status, body: Some(SuccessData { data, message: None }) }
    }

    pub fn ok(data: Option<T>) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: Option<T>) -> Self {
        Self::with_status(StatusCode::CREATED, data)
    }

    /// Empty 204; any message set afterwards is dropped.
    pub fn no_content() -> Self {
        Self { status: StatusCode::NO_CONTENT, body: None }
    }

    pub fn message(mut self, msg: impl Into<Cow<'static, str>>) -> Self {
        if let Some(body) = self.body.as_mut() {
            body.message = Some(msg.into());
        }
        self
    }
}

impl<T: serde::Serialize> Responder for Success<T> {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        match self.body {
            Some(body) => HttpResponse::build(self.status).json(body),
            None => HttpResponse::build(self.status).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::test::TestRequest;

    async fn render<T: serde::Serialize>(success: Success<T>) -> (StatusCode, Vec<u8>) {
        let res = success.respond_to(&TestRequest::default().to_http_request());
        let status = res.status();
        let body = to_bytes(res.into_body()).await.unwrap();
        (status, body.to_vec())
    }

    #[actix_web::test]
    async fn created_wraps_data_and_message() {
        let (status, body) = render(Success::created(Some(42)).message("File uploaded")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, br#"{"data":42,"message":"File uploaded"}"#);
    }

    #[actix_web::test]
    async fn message_is_omitted_when_unset() {
        let (status, body) = render(Success::ok(Some("x"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"data":"x"}"#);
    }

    #[actix_web::test]
    async fn no_content_has_empty_body() {
        let (status, body) = render(Success::<()>::no_content().message("ignored")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
    }
}
