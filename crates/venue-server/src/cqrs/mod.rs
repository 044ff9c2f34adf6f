pub use mediator::DefaultAsyncMediator;

use crate::features::FeatureState;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(state: FeatureState) -> AppMediator {
    let ctx = state.import_context();

    DefaultAsyncMediator::builder()
        // Searches
        .add_handler({
            let invoker = state.invoker.clone();
            move |cmd| {
                let invoker = invoker.clone();
                async move { crate::features::searches::commands::run::handle(invoker, cmd).await }
            }
        })
        .add_handler({
            let pool = state.db.clone();
            move |cmd| {
                let pool = pool.clone();
                async move {
                    crate::features::searches::commands::record_download::handle(pool, cmd).await
                }
            }
        })
        .add_handler({
            let pool = state.db.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::searches::queries::list::handle(pool, query).await }
            }
        })
        .add_handler({
            let pool = state.db.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::searches::queries::images::handle(pool, query).await }
            }
        })
        // Imports
        .add_handler({
            let ctx = ctx.clone();
            move |cmd| {
                let ctx = ctx.clone();
                async move { crate::features::imports::commands::upload_csv::handle(ctx, cmd).await }
            }
        })
        .add_handler({
            let ctx = ctx.clone();
            move |cmd| {
                let ctx = ctx.clone();
                async move {
                    crate::features::imports::commands::submit_names::handle(ctx, cmd).await
                }
            }
        })
        .add_handler({
            let store = state.store.clone();
            move |query| {
                let store = store.clone();
                async move {
                    crate::features::imports::queries::list_imports::handle(store, query).await
                }
            }
        })
        .add_handler({
            let store = state.store.clone();
            move |query| {
                let store = store.clone();
                async move { crate::features::imports::queries::get_import::handle(store, query).await }
            }
        })
        .add_handler({
            let store = state.store.clone();
            move |query| {
                let store = store.clone();
                async move { crate::features::imports::queries::list_items::handle(store, query).await }
            }
        })
        .add_handler({
            let store = state.store.clone();
            move |query| {
                let store = store.clone();
                async move {
                    crate::features::imports::queries::recent_items::handle(store, query).await
                }
            }
        })
        .add_handler({
            let pool = state.db.clone();
            move |query| {
                let pool = pool.clone();
                async move { crate::features::imports::queries::export::handle(pool, query).await }
            }
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchQueue, InMemoryBatchStore};
    use crate::search::{SearchFailure, SearchInvoker, SearchOutcome};
    use async_trait::async_trait;
    use sqlx::PgPool;
    use std::sync::Arc;
    use venue_common::SearchType;

    struct NoopInvoker;

    #[async_trait]
    impl SearchInvoker for NoopInvoker {
        async fn invoke(
            &self,
            venue_name: &str,
            _search_type: SearchType,
        ) -> Result<SearchOutcome, SearchFailure> {
            Err(SearchFailure::new(
                crate::search::FailureKind::NoResults,
                format!("No images found for '{}'", venue_name),
            ))
        }
    }

    fn state() -> FeatureState {
        let (queue, _receiver) = BatchQueue::channel(8);
        FeatureState {
            db: PgPool::connect_lazy("postgres://localhost/venue_test").unwrap(),
            store: Arc::new(InMemoryBatchStore::new()),
            invoker: Arc::new(NoopInvoker),
            queue,
            max_names: 10,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mediator_builds() {
        let _mediator = build_mediator(state());
    }
}
