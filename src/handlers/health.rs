use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;

/// 根路径健康检查/服务说明
#[get("/")]
pub async fn hello(data: web::Data<AppState>) -> impl Responder {
    let supported = data.parser_registry.supported_extensions();
    HttpResponse::Ok().json(serde_json::json!({
        "message": "体数据边界网格抽取服务",
        "endpoints": [
            "POST /mesh/extract",
            "GET /mesh/task?task_id=<id>",
            "GET /mesh/buffer?task_id=<id>&label=<label>",
        ],
        "supported_extensions": supported,
        "resource_dir": data.resource_dir,
        "output_dir": data.output_dir,
        "active_tasks": data.task_store.task_count(),
    }))
}
