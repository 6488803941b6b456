pub mod app;
pub mod endpoint;
pub mod partition;
pub mod protocol;
pub mod rpc;
pub mod wordcount;

pub use app::{KeyValue, MapReduceApp};
pub use endpoint::{Endpoint, EndpointError, COORDINATOR_ENV};
pub use protocol::{
    AssignRequest, Assignment, CompletionAck, CompletionReport, EchoArgs, EchoReply, JobProgress,
    JobStatus, TaskKind, WorkerId,
};
pub use rpc::{CoordinatorClient, RpcError};
pub use wordcount::WordCount;
