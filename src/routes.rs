use actix_web::web;

use crate::handlers;

/// 统一注册 HTTP 路由，方便集中管理
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::hello)
        .service(handlers::extract_mesh)
        .service(handlers::get_task)
        .service(handlers::get_mesh_buffer);
}
