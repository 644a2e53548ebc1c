//! src/reducers/adder.rs
use crate::reducers::Reducer;
use crate::store::Pair;
use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::mpsc::{Receiver, Sender};

/// Sums decimal counts and emits a single `(key, total)` pair.
pub struct Adder;

#[async_trait]
impl Reducer for Adder {
    async fn reduce(
        &self,
        key: String,
        mut values: Receiver<String>,
        output: Sender<Pair>,
    ) -> anyhow::Result<()> {
        let mut total: i64 = 0;
        while let Some(value) = values.recv().await {
            total += value
                .parse::<i64>()
                .with_context(|| format!("value '{value}' for key '{key}' is not a count"))?;
        }
        output
            .send(Pair::new(key, total.to_string()))
            .await
            .context("pair consumer hung up")?;
        Ok(())
    }
}
