use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::SessionIssuer;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health_check, login, refresh, register, revoke};

pub fn run(listener: TcpListener, issuer: SessionIssuer) -> Result<Server, std::io::Error> {
    let issuer = web::Data::new(issuer);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(issuer.clone())
            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    .route("/users", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    // Protected routes (require a valid access token)
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware)
                            .route(web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
