//! The intra-cluster `analyst.intra.Analyst` service: runs one algorithm
//! against one shard stored next to this analyst.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::debug;

use super::to_status;
use crate::mapreduce::Executor;
use crate::pb::intra::analyst_server::Analyst;
use crate::pb::intra::{ExecuteInfo, ExecuteResponse};

pub struct IntraService {
    executor: Arc<dyn Executor>,
}

impl IntraService {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

#[tonic::async_trait]
impl Analyst for IntraService {
    async fn execute(
        &self,
        request: Request<ExecuteInfo>,
    ) -> Result<Response<ExecuteResponse>, Status> {
        let info = request.into_inner();
        if info.file.is_empty() {
            return Err(Status::invalid_argument("File is required"));
        }
        if info.alg.is_empty() {
            return Err(Status::invalid_argument("Alg is required"));
        }
        debug!(file = %info.file, alg = %info.alg, "executing");
        let result = self
            .executor
            .execute(&info.file, &info.alg, &info.meta)
            .await
            .map_err(to_status)?;

        Ok(Response::new(ExecuteResponse { result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapreduce::Results;
    use crate::pb::v1::AggregateInfo;
    use crate::workload::{Registry, TIMERANGE};
    use anyhow::{anyhow, Result};
    use prost::Message;
    use std::sync::Mutex;
    use tonic::Code;

    #[derive(Default)]
    struct MockExecutor {
        fail: bool,
        calls: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    #[tonic::async_trait]
    impl Executor for MockExecutor {
        async fn execute(&self, file: &str, alg: &str, meta: &[u8]) -> Result<Results> {
            self.calls
                .lock()
                .unwrap()
                .push((file.into(), alg.into(), meta.to_vec()));
            Registry::default().build(alg, meta)?;
            if self.fail {
                return Err(anyhow!("some-error"));
            }
            Ok(Results::from([("1".to_string(), b"some-value".to_vec())]))
        }
    }

    fn request(file: &str, alg: &str) -> Request<ExecuteInfo> {
        Request::new(ExecuteInfo {
            file: file.into(),
            alg: alg.into(),
            meta: AggregateInfo::default().encode_to_vec(),
        })
    }

    fn service(executor: Arc<MockExecutor>) -> IntraService {
        IntraService::new(executor)
    }

    #[tokio::test]
    async fn passes_the_request_to_the_executor() {
        let executor = Arc::new(MockExecutor::default());

        let resp = service(executor.clone())
            .execute(request("some-file", TIMERANGE))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(resp.result["1"], b"some-value");
        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls[0].0, "some-file");
        assert_eq!(calls[0].1, TIMERANGE);
        assert_eq!(calls[0].2, AggregateInfo::default().encode_to_vec());
    }

    #[tokio::test]
    async fn requires_file_and_alg() {
        let svc = service(Arc::new(MockExecutor::default()));

        let status = svc.execute(request("", TIMERANGE)).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "File is required");

        let status = svc.execute(request("some-file", "")).await.unwrap_err();
        assert_eq!(status.message(), "Alg is required");
    }

    #[tokio::test]
    async fn unknown_algorithms_are_invalid_arguments() {
        let status = service(Arc::new(MockExecutor::default()))
            .execute(request("some-file", "unknown"))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().contains("unknown alg"));
    }

    #[tokio::test]
    async fn executor_errors_are_returned() {
        let executor = Arc::new(MockExecutor {
            fail: true,
            ..Default::default()
        });
        let status = service(executor)
            .execute(request("some-file", TIMERANGE))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Internal);
        assert!(status.message().contains("some-error"));
    }
}
