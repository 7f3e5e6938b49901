#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn test_css_get() {
        let mut app = test::init_service(App::new().service(rublog::web::css::view_css)).await;
        let req = test::TestRequest::default().uri("/style.css").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_rt::test]
    async fn test_login_form_renders() {
        let mut app =
            test::init_service(App::new().service(rublog::web::account::login_get)).await;
        let req = test::TestRequest::default().uri("/login").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_rt::test]
    async fn test_signup_form_renders() {
        let mut app =
            test::init_service(App::new().service(rublog::web::account::signup_get)).await;
        let req = test::TestRequest::default().uri("/signup").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_rt::test]
    async fn test_about_pages_render() {
        let mut app = test::init_service(
            App::new()
                .service(rublog::web::about::view_author)
                .service(rublog::web::about::view_tech),
        )
        .await;
        for uri in ["/about/author/", "/about/tech/"] {
            let req = test::TestRequest::default().uri(uri).to_request();
            let resp = test::call_service(&mut app, req).await;
            assert!(resp.status().is_success(), "{} did not render", uri);
        }
    }

    #[actix_rt::test]
    async fn test_create_redirects_guests_to_login() {
        let mut app =
            test::init_service(App::new().service(rublog::web::post::create_post_get)).await;
        let req = test::TestRequest::default().uri("/create/").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp
            .headers()
            .get("Location")
            .expect("redirect must carry a Location header")
            .to_str()
            .unwrap();
        assert_eq!(location, "/login?next=%2Fcreate%2F");
    }

    #[actix_rt::test]
    async fn test_feed_redirects_guests_to_login() {
        let mut app =
            test::init_service(App::new().service(rublog::web::follow::follow_index)).await;
        let req = test::TestRequest::default().uri("/follow/").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp
            .headers()
            .get("Location")
            .expect("redirect must carry a Location header")
            .to_str()
            .unwrap();
        assert_eq!(location, "/login?next=%2Ffollow%2F");
    }

    #[actix_rt::test]
    async fn test_account_redirects_guests_to_login() {
        let mut app =
            test::init_service(App::new().service(rublog::web::account::account_get)).await;
        let req = test::TestRequest::default().uri("/account").to_request();
        let resp = test::call_service(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }
}
