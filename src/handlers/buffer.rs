use actix_web::{HttpResponse, Responder, get, http::header::ContentType, web};
use byteorder::{LittleEndian, WriteBytesExt};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::mesh::LabelMesh;

#[derive(Deserialize)]
pub struct BufferQuery {
    pub task_id: String,
    pub label: u32,
}

/// 以二进制形式返回某个标签的网格，供前端直接上传到 GPU
///
/// 布局（小端）：顶点坐标 f32 x,y,z 依次排列，之后是三角面索引 u32 i,j,k（从 0 开始）
#[get("/mesh/buffer")]
pub async fn get_mesh_buffer(
    data: web::Data<AppState>,
    query: web::Query<BufferQuery>,
) -> impl Responder {
    let Some(task) = data.task_store.get(&query.task_id) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "无效的 task_id",
            "task_id": query.task_id,
        }));
    };

    // 检查后台抽取是否完成
    if !task.is_finished() {
        return HttpResponse::Accepted().json(serde_json::json!({
            "error": "网格正在抽取中，请稍后重试",
            "task_id": query.task_id,
            "label": query.label,
            "status": "pending",
        }));
    }

    // 获取并移除网格数据（请求后立即释放内存）
    let Some(mesh) = task.take_buffer(query.label) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "标签不存在、已被请求或任务失败",
            "task_id": query.task_id,
            "label": query.label,
        }));
    };

    let bytes = match encode_mesh(&mesh) {
        Ok(bytes) => bytes,
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "写入网格数据失败",
                "details": e.to_string(),
            }));
        }
    };

    HttpResponse::Ok()
        .content_type(ContentType::octet_stream())
        .append_header(("X-Label", query.label.to_string()))
        .append_header(("X-Vertex-Count", mesh.vertex_count().to_string()))
        .append_header(("X-Face-Count", mesh.face_count().to_string()))
        .append_header(("X-Mesh-Task", query.task_id.clone()))
        .body(bytes)
}

/// 顶点 f32 x3 + 面 u32 x3，小端
pub fn encode_mesh(mesh: &LabelMesh) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity((mesh.vertex_count() + mesh.face_count()) * 12);
    for vertex in &mesh.vertices {
        for &coord in vertex {
            bytes.write_f32::<LittleEndian>(coord as f32)?;
        }
    }
    for face in &mesh.faces {
        for &index in face {
            bytes.write_u32::<LittleEndian>(index)?;
        }
    }
    Ok(bytes)
}
