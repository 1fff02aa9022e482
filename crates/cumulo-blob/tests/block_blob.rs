//! Block blob uploads against the in-memory service.

mod common;

use bytes::Bytes;
use cumulo_blob::{BlobType, Error, block_id};
use cumulo_http::{Context, Method};

use common::{MockBlobService, client, pattern};

fn queries(service: &MockBlobService) -> Vec<String> {
    service
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Put)
        .map(|r| r.url.query().unwrap_or_default().to_owned())
        .collect()
}

#[tokio::test]
async fn test_small_buffer_is_a_single_put() {
    let service = MockBlobService::new();
    let blocks = client(&service, "/c/doc").block_blob_client();

    let info = blocks.upload_from_buffer(&Context::new(), pattern(3000)).await.unwrap();

    assert!(!info.etag.is_empty());
    assert_eq!(service.calls(), 1);
    let request = service.requests().pop().unwrap();
    assert_eq!(request.headers.get("x-ms-blob-type"), Some("BlockBlob"));
    let stored = service.blob("/c/doc").unwrap();
    assert_eq!(stored.data, pattern(3000));
    assert_eq!(stored.blob_type, BlobType::Block.as_str());
}

#[tokio::test]
async fn test_large_buffer_stages_blocks_then_commits() {
    let service = MockBlobService::new();
    let blocks = client(&service, "/c/doc").block_blob_client();

    blocks.upload_from_buffer(&Context::new(), pattern(5000)).await.unwrap();

    // Five 1 KiB blocks, then the commit.
    let queries = queries(&service);
    assert_eq!(queries.len(), 6);
    assert_eq!(queries.iter().filter(|q| q.starts_with("comp=block&")).count(), 5);
    assert_eq!(queries.last().map(String::as_str), Some("comp=blocklist"));
    assert_eq!(service.blob("/c/doc").unwrap().data, pattern(5000));
}

#[tokio::test]
async fn test_failed_stage_is_never_committed() {
    let service = MockBlobService::new();
    service.fail_block(&block_id(2), 500);
    let blocks = client(&service, "/c/doc").block_blob_client();

    let err = blocks.upload_from_buffer(&Context::new(), pattern(5000)).await.unwrap_err();

    let Error::Transfer(transfer) = &err else {
        panic!("expected an incomplete transfer, got {err:?}");
    };
    let report = transfer.report().unwrap();
    assert!(matches!(report.chunks[2].status, cumulo_transfer::ChunkStatus::Failed { status: Some(500), .. }));
    assert!(!queries(&service).iter().any(|q| q == "comp=blocklist"));
    assert!(service.blob("/c/doc").is_none());
}

#[tokio::test]
async fn test_upload_from_file() {
    let service = MockBlobService::new();
    let blocks = client(&service, "/c/file").block_blob_client();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.bin");
    std::fs::write(&path, pattern(6000)).unwrap();

    blocks.upload_from_file(&Context::new(), &path).await.unwrap();

    assert_eq!(service.calls(), 7);
    assert_eq!(service.blob("/c/file").unwrap().data, pattern(6000));
}

#[tokio::test]
async fn test_commit_order_defines_content() {
    let service = MockBlobService::new();
    let blocks = client(&service, "/c/doc").block_blob_client();
    let ctx = Context::new();

    blocks.stage_block(&ctx, &block_id(0), Bytes::from_static(b"hello ")).await.unwrap();
    blocks.stage_block(&ctx, &block_id(1), Bytes::from_static(b"world")).await.unwrap();
    blocks.commit_block_list(&ctx, &[block_id(1), block_id(0)]).await.unwrap();

    assert_eq!(service.blob("/c/doc").unwrap().data, b"worldhello ");
    let commit = service.requests().pop().unwrap();
    assert_eq!(commit.headers.get("Content-Type"), Some("application/xml"));
}

#[tokio::test]
async fn test_commit_of_unknown_block_fails() {
    let service = MockBlobService::new();
    let blocks = client(&service, "/c/doc").block_blob_client();

    let err = blocks
        .commit_block_list(&Context::new(), &[block_id(7)])
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.error_code(), Some("InvalidBlockList"));
    assert!(service.blob("/c/doc").is_none());
}
