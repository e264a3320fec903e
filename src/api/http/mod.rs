pub mod axum;
pub mod graphql;
