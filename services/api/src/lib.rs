pub mod error;
pub mod extractors;
pub mod routes;
pub mod scheduling;
pub mod schemas;
pub mod state;

use actix_web::dev::Service;
use actix_web::{web, App};

pub fn create_app(
    state: state::AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    // malformed JSON bodies get the standard envelope, not actix's default
    let json_cfg = web::JsonConfig::default().error_handler(|err, _| {
        error::HttpApiError::from(common::AppError::Validation(vec![err.to_string()])).into()
    });

    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_cfg)
        .configure(routes::configure)
        .wrap_fn(|req, srv| {
            extractors::attach_identity(&req);
            srv.call(req)
        })
}
