mod helpers;
mod mocks;
mod orders;
mod payments;
mod webhook;

mod misc {
    use actix_web::{http::StatusCode, test::TestRequest};

    use super::helpers::TestContext;

    #[actix_web::test]
    async fn health_endpoint() {
        let ctx = TestContext::new().await;
        let (status, body) = ctx.send(TestRequest::get().uri("/health"), "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "👍️\n");
        ctx.finish().await;
    }
}
