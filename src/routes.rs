use crate::{
    api::{balance, leave_request, leave_type},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

/// Per-IP limiter allowing `requests_per_min` with a matching burst.
pub fn build_limiter(
    requests_per_min: u32,
) -> anyhow::Result<GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} per minute"))
}

pub fn configure(
    cfg: &mut web::ServiceConfig,
    config: &Config,
    limiter: &GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>,
) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(Governor::new(limiter)) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // static segments before /leave/{id}
                    .service(web::resource("/mine").route(web::get().to(leave_request::my_leaves)))
                    .service(
                        web::resource("/employee/{employee_id}")
                            .route(web::get().to(leave_request::employee_leaves)),
                    )
                    .service(
                        web::resource("/manager/pending")
                            .route(web::get().to(leave_request::manager_pending)),
                    )
                    .service(
                        web::resource("/hr/pending").route(web::get().to(leave_request::hr_pending)),
                    )
                    .service(web::resource("/balance").route(web::get().to(balance::get_balance)))
                    .service(
                        web::resource("/balances")
                            .route(web::put().to(balance::allocate_balance)),
                    )
                    .service(
                        web::resource("/balances/{employee_id}")
                            .route(web::get().to(balance::employee_balances)),
                    )
                    .service(
                        web::resource("/comp-off").route(web::post().to(balance::grant_comp_off)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    .service(
                        web::resource("/{id}/manager-decision")
                            .route(web::put().to(leave_request::manager_decision)),
                    )
                    .service(
                        web::resource("/{id}/hr-decision")
                            .route(web::put().to(leave_request::hr_decision)),
                    )
                    .service(
                        web::resource("/{id}/withdraw")
                            .route(web::put().to(leave_request::withdraw_leave)),
                    )
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/leave-types")
                    // /leave-types
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_type::list_leave_types))
                            .route(web::post().to(leave_type::create_leave_type)),
                    )
                    // /leave-types/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(leave_type::update_leave_type))
                            .route(web::delete().to(leave_type::delete_leave_type)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_configured_rates() {
        assert!(build_limiter(1000).is_ok());
        assert!(build_limiter(1).is_ok());
        assert!(build_limiter(0).is_ok());
    }
}
