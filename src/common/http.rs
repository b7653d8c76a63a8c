use actix_web::{HttpResponse, Responder, http::header};

use super::error::Res;

pub struct Success;
impl Success {
    pub fn page(body: String) -> Res<impl Responder> {
        Ok(HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body))
    }

    pub fn redirect(location: &str) -> Res<impl Responder> {
        Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, location.to_string()))
            .finish())
    }
}
