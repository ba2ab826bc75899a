use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::{auth::Claims, graphql::Schema};

/// GraphQL endpoint. The auth middleware has already validated the bearer
/// token; its claims are forwarded into the resolver context.
#[post("/graphql")]
pub async fn graphql(
    schema: web::Data<Schema>,
    http_request: HttpRequest,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();

    if let Some(claims) = http_request.extensions().get::<Claims>().cloned() {
        request = request.data(claims);
    }

    schema.execute(request).await.into()
}

#[get("/graphiql")]
pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/api/graphql").finish())
}
