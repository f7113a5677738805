use std::convert::Infallible;

use async_graphql::http::GraphiQLSource;
use async_graphql_warp::{graphql, graphql_subscription, GraphQLBadRequest, GraphQLResponse};
use log::{error, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::schema::GuestbookSchema;

pub const GRAPHQL_PATH: &str = "graphql";

/// `/graphql` answers queries and mutations over HTTP and upgrades to a
/// `graphql-transport-ws` websocket for subscriptions. `/` serves GraphiQL.
pub fn routes(
    schema: GuestbookSchema,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let endpoint = warp::path(GRAPHQL_PATH).and(warp::path::end());

    let ws_route = endpoint.clone().and(graphql_subscription(schema.clone()));

    let http_route = endpoint.and(graphql(schema)).and_then(
        |(schema, request): (GuestbookSchema, async_graphql::Request)| async move {
            Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
        },
    );

    let graphiql_endpoint = format!("/{GRAPHQL_PATH}");
    let graphiql = warp::path::end().and(warp::get()).map(move || {
        warp::reply::html(
            GraphiQLSource::build()
                .endpoint(&graphiql_endpoint)
                .subscription_endpoint(&graphiql_endpoint)
                .finish(),
        )
    });

    ws_route
        .or(http_route)
        .or(graphiql)
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_methods(vec!["GET", "POST", "OPTIONS"])
                .allow_headers(vec!["content-type"]),
        )
        .recover(handle_rejection)
        .with(warp::log("guestbook::http"))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(GraphQLBadRequest(err)) = err.find() {
        warn!("Rejected GraphQL request: {}", err);
        return Ok(warp::reply::with_status(
            err.to_string(),
            StatusCode::BAD_REQUEST,
        ));
    }

    if err.is_not_found() {
        return Ok(warp::reply::with_status(
            "Not Found".to_string(),
            StatusCode::NOT_FOUND,
        ));
    }

    error!("Unhandled rejection: {:?}", err);
    Ok(warp::reply::with_status(
        "INTERNAL_SERVER_ERROR".to_string(),
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}
