//! API documentation: the OpenAPI document and the two HTML viewers that render it.
//!
//! Both viewers load their assets from a CDN and fetch [`OPENAPI_PATH`].

use actix_web::{get, http::header::ContentType, HttpResponse, Responder};
use serde_json::{json, Value};

use crate::app::{API_DESCRIPTION, API_TITLE, API_VERSION};

pub const DOCS_PATH: &str = "/docs";
pub const REDOC_PATH: &str = "/redoc";
pub const OPENAPI_PATH: &str = "/openapi.json";

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
    })
}

fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": { "$ref": format!("#/components/schemas/{}", schema) } } }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

/// The OpenAPI 3 description of every route the application mounts.
pub fn openapi_document() -> Value {
    let task_id = json!([{
        "name": "id", "in": "path", "required": true,
        "schema": { "type": "integer", "format": "int64" }
    }]);
    let secured = json!([{ "bearerAuth": [] }]);

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": API_TITLE,
            "description": API_DESCRIPTION,
            "version": API_VERSION
        },
        "paths": {
            "/api/auth/register": {
                "post": {
                    "tags": ["auth"],
                    "summary": "Register a new user",
                    "requestBody": json_body("RegisterRequest"),
                    "responses": {
                        "201": json_response("Registered", schema_ref("AuthResponse")),
                        "400": error_response("Email already registered"),
                        "422": error_response("Validation failed")
                    }
                }
            },
            "/api/auth/login": {
                "post": {
                    "tags": ["auth"],
                    "summary": "Exchange credentials for an access token",
                    "requestBody": json_body("LoginRequest"),
                    "responses": {
                        "200": json_response("Authenticated", schema_ref("AuthResponse")),
                        "401": error_response("Invalid credentials")
                    }
                }
            },
            "/api/auth/me": {
                "get": {
                    "tags": ["auth"],
                    "summary": "Profile of the authenticated user",
                    "security": secured,
                    "responses": {
                        "200": json_response("Current user", schema_ref("User")),
                        "401": error_response("Missing or invalid token")
                    }
                }
            },
            "/api/tasks": {
                "get": {
                    "tags": ["tasks"],
                    "summary": "List the caller's tasks, newest first",
                    "security": secured,
                    "parameters": [
                        { "name": "status", "in": "query", "schema": schema_ref("TaskStatus") },
                        { "name": "priority", "in": "query", "schema": schema_ref("TaskPriority") },
                        { "name": "search", "in": "query", "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": json_response("Tasks", json!({ "type": "array", "items": schema_ref("Task") })),
                        "401": error_response("Missing or invalid token")
                    }
                },
                "post": {
                    "tags": ["tasks"],
                    "summary": "Create a task",
                    "security": secured,
                    "requestBody": json_body("TaskCreate"),
                    "responses": {
                        "201": json_response("Created", schema_ref("Task")),
                        "422": error_response("Validation failed")
                    }
                }
            },
            "/api/tasks/{id}": {
                "get": {
                    "tags": ["tasks"],
                    "summary": "Fetch a task",
                    "security": secured,
                    "parameters": task_id,
                    "responses": {
                        "200": json_response("Task", schema_ref("Task")),
                        "404": error_response("Task not found")
                    }
                },
                "put": {
                    "tags": ["tasks"],
                    "summary": "Partially update a task",
                    "security": secured,
                    "parameters": task_id,
                    "requestBody": json_body("TaskUpdate"),
                    "responses": {
                        "200": json_response("Updated", schema_ref("Task")),
                        "404": error_response("Task not found"),
                        "422": error_response("Validation failed")
                    }
                },
                "delete": {
                    "tags": ["tasks"],
                    "summary": "Delete a task",
                    "security": secured,
                    "parameters": task_id,
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error_response("Task not found")
                    }
                }
            },
            "/api/tasks/{id}/status": {
                "patch": {
                    "tags": ["tasks"],
                    "summary": "Change a task's status",
                    "security": secured,
                    "parameters": task_id,
                    "requestBody": json_body("TaskStatusUpdate"),
                    "responses": {
                        "200": json_response("Updated", schema_ref("Task")),
                        "404": error_response("Task not found")
                    }
                }
            }
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": {
                "Error": {
                    "type": "object",
                    "required": ["detail"],
                    "properties": { "detail": { "type": "string" } }
                },
                "TaskStatus": {
                    "type": "string",
                    "enum": ["PENDING", "IN_PROGRESS", "COMPLETED", "CANCELLED"]
                },
                "TaskPriority": {
                    "type": "string",
                    "enum": ["LOW", "MEDIUM", "HIGH", "URGENT"]
                },
                "Task": {
                    "type": "object",
                    "required": ["id", "title", "status", "priority", "created_at", "updated_at", "user_id"],
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "description": { "type": "string", "nullable": true },
                        "status": schema_ref("TaskStatus"),
                        "priority": schema_ref("TaskPriority"),
                        "due_date": { "type": "string", "format": "date", "nullable": true },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": "string", "format": "date-time" },
                        "user_id": { "type": "integer" }
                    }
                },
                "TaskCreate": {
                    "type": "object",
                    "required": ["title"],
                    "properties": {
                        "title": { "type": "string", "minLength": 1, "maxLength": 200 },
                        "description": { "type": "string", "maxLength": 1000 },
                        "status": schema_ref("TaskStatus"),
                        "priority": schema_ref("TaskPriority"),
                        "due_date": { "type": "string", "format": "date" }
                    }
                },
                "TaskUpdate": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "minLength": 1, "maxLength": 200 },
                        "description": { "type": "string", "maxLength": 1000 },
                        "status": schema_ref("TaskStatus"),
                        "priority": schema_ref("TaskPriority"),
                        "due_date": { "type": "string", "format": "date" }
                    }
                },
                "TaskStatusUpdate": {
                    "type": "object",
                    "required": ["status"],
                    "properties": { "status": schema_ref("TaskStatus") }
                },
                "RegisterRequest": {
                    "type": "object",
                    "required": ["username", "email", "password"],
                    "properties": {
                        "username": { "type": "string", "minLength": 3, "maxLength": 32, "pattern": "^[a-zA-Z0-9_-]+$" },
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string", "minLength": 6 }
                    }
                },
                "LoginRequest": {
                    "type": "object",
                    "required": ["email", "password"],
                    "properties": {
                        "email": { "type": "string", "format": "email" },
                        "password": { "type": "string", "minLength": 6 }
                    }
                },
                "AuthResponse": {
                    "type": "object",
                    "required": ["access_token", "token_type", "user_id"],
                    "properties": {
                        "access_token": { "type": "string" },
                        "token_type": { "type": "string", "enum": ["bearer"] },
                        "user_id": { "type": "integer" }
                    }
                },
                "User": {
                    "type": "object",
                    "required": ["id", "username", "email", "created_at"],
                    "properties": {
                        "id": { "type": "integer" },
                        "username": { "type": "string" },
                        "email": { "type": "string" },
                        "created_at": { "type": "string", "format": "date-time" }
                    }
                }
            }
        }
    })
}

fn swagger_ui_html() -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
<title>{title} - Swagger UI</title>
<meta charset="utf-8">
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
<script>
SwaggerUIBundle({{ url: "{spec}", dom_id: "#swagger-ui", deepLinking: true }});
</script>
</body>
</html>"##,
        title = API_TITLE,
        spec = OPENAPI_PATH
    )
}

fn redoc_html() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>{title} - ReDoc</title>
<meta charset="utf-8">
</head>
<body>
<redoc spec-url="{spec}"></redoc>
<script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>"#,
        title = API_TITLE,
        spec = OPENAPI_PATH
    )
}

#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(openapi_document())
}

#[get("/docs")]
pub async fn swagger_ui() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(swagger_ui_html())
}

#[get("/redoc")]
pub async fn redoc() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(redoc_html())
}
