pub mod auth;
pub mod health;
pub mod tasks;
pub mod teams;

use actix_web::web;

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Registers every route. `/tasks` and `/teams` sit behind the bearer-token gate.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
    }))
    .service(health::health)
    .service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register),
    )
    .service(
        web::scope("/tasks")
            .wrap(AuthMiddleware)
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::create_tasks)
            .service(tasks::get_tasks_by_user)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    )
    .service(
        web::scope("/teams")
            .wrap(AuthMiddleware)
            .service(teams::get_teams)
            .service(teams::create_team)
            .service(teams::add_members)
            .service(teams::add_member)
            .service(teams::remove_member)
            .service(teams::get_team)
            .service(teams::update_team)
            .service(teams::delete_team),
    );
}
