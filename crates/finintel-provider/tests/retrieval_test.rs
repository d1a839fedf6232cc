//! Client + classification over a static source.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use finintel_core::TickerSymbol;
use finintel_provider::{
    classify, MarketDataClient, RetrievalError, SourceError, StaticSource, WorkerPool,
};

fn ticker(s: &str) -> TickerSymbol {
    TickerSymbol::parse(s).unwrap()
}

#[tokio::test]
async fn listed_symbol_produces_record() {
    let source = Arc::new(StaticSource::new().with_listed("AAPL", "Apple Inc."));
    let client = MarketDataClient::new(source.clone(), WorkerPool::new(2, Duration::from_secs(5)));

    let fields = client.fetch_info("AAPL").await.unwrap();
    let record = classify(&ticker("AAPL"), client.source_name(), &fields, Utc::now()).unwrap();

    assert_eq!(record.entity_information.entity_name, "Apple Inc.");
    assert_eq!(record.metadata.data_source, "static");
    assert_eq!(source.info_calls(), 1);
}

#[tokio::test]
async fn transport_failure_is_network_error() {
    let source = Arc::new(
        StaticSource::new().with_info_error("AAPL", SourceError::Transport("connection refused".into())),
    );
    let client = MarketDataClient::new(source, WorkerPool::new(1, Duration::from_secs(5)));

    let err: RetrievalError = client.fetch_info("AAPL").await.unwrap_err().into();
    assert_eq!(err.code(), "NETWORK_ERROR");
}

#[tokio::test]
async fn slow_source_is_network_error() {
    let source = Arc::new(
        StaticSource::new()
            .with_listed("AAPL", "Apple Inc.")
            .with_delay(Duration::from_millis(300)),
    );
    let client = MarketDataClient::new(source, WorkerPool::new(1, Duration::from_millis(30)));

    let err: RetrievalError = client.fetch_info("AAPL").await.unwrap_err().into();
    assert_eq!(err.code(), "NETWORK_ERROR");
}
