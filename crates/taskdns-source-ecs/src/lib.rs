// # ECS Task Source
//
// This crate provides an ECS-backed task source for the TaskDNS system.
//
// ## Architecture
//
// 1. `ListTasks` (desired status RUNNING), following `nextToken` pages
// 2. `DescribeTasks` in chunks of 100 ARNs (the service maximum)
// 3. For each task, the `ElasticNetworkInterface` attachment's
//    `privateIPv4Address` detail is the task's address
//
// A task without that attachment or detail is an error, not a silent
// omission: an incomplete list would let the reconciler repoint records
// away from tasks that are in fact running.
//
// The client is built by the caller from an explicit `SdkConfig`; this
// crate holds no global client state.

use async_trait::async_trait;
use aws_sdk_ecs::Client;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{DesiredStatus, Task};
use std::net::Ipv4Addr;
use taskdns_core::traits::TaskSource;
use taskdns_core::{Error, Result};

/// Attachment type carrying a task's network interface details
pub const ENI_ATTACHMENT_TYPE: &str = "ElasticNetworkInterface";

/// Attachment detail holding the private IPv4 address
pub const PRIVATE_IPV4_DETAIL: &str = "privateIPv4Address";

/// Maximum number of tasks accepted by one DescribeTasks call
const DESCRIBE_TASKS_BATCH: usize = 100;

/// ECS task source
pub struct EcsTaskSource {
    client: Client,
}

impl std::fmt::Debug for EcsTaskSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcsTaskSource").finish_non_exhaustive()
    }
}

impl EcsTaskSource {
    /// Create a task source around an existing ECS client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a task source from shared AWS configuration
    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }

    /// List the ARNs of all running tasks in a cluster
    async fn list_task_arns(&self, cluster_id: &str) -> Result<Vec<String>> {
        let mut arns = Vec::new();

        let mut pages = self
            .client
            .list_tasks()
            .cluster(cluster_id)
            .desired_status(DesiredStatus::Running)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                Error::task_source(format!(
                    "ListTasks failed for cluster {}: {}",
                    cluster_id,
                    DisplayErrorContext(&e)
                ))
            })?;
            arns.extend(page.task_arns().iter().cloned());
        }

        Ok(arns)
    }

    /// Describe tasks, at most [`DESCRIBE_TASKS_BATCH`] per request
    async fn describe_tasks(&self, cluster_id: &str, arns: &[String]) -> Result<Vec<Task>> {
        let mut tasks = Vec::with_capacity(arns.len());

        for chunk in arns.chunks(DESCRIBE_TASKS_BATCH) {
            let output = self
                .client
                .describe_tasks()
                .cluster(cluster_id)
                .set_tasks(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(|e| {
                    Error::task_source(format!(
                        "DescribeTasks failed for cluster {}: {}",
                        cluster_id,
                        DisplayErrorContext(&e)
                    ))
                })?;

            // Typically a task that stopped between the two calls.
            for failure in output.failures() {
                tracing::warn!(
                    "Skipping task {} in cluster {}: {}",
                    failure.arn().unwrap_or("<unknown>"),
                    cluster_id,
                    failure.reason().unwrap_or("no reason given")
                );
            }

            tasks.extend(output.tasks().iter().cloned());
        }

        Ok(tasks)
    }
}

/// Extract the private IPv4 address from a task's network interface attachment
///
/// The attachment is matched by type, not by position, so a task carrying
/// other attachment kinds ahead of its ENI still resolves correctly.
pub fn private_ipv4(task: &Task) -> Result<Ipv4Addr> {
    let arn = task.task_arn().unwrap_or("<unknown task>");

    let attachment = task
        .attachments()
        .iter()
        .find(|a| a.r#type() == Some(ENI_ATTACHMENT_TYPE))
        .ok_or_else(|| {
            Error::task_source(format!(
                "Task {} has no {} attachment",
                arn, ENI_ATTACHMENT_TYPE
            ))
        })?;

    let value = attachment
        .details()
        .iter()
        .find(|d| d.name() == Some(PRIVATE_IPV4_DETAIL))
        .and_then(|d| d.value())
        .ok_or_else(|| {
            Error::task_source(format!(
                "Task {} attachment is missing {}",
                arn, PRIVATE_IPV4_DETAIL
            ))
        })?;

    value.parse().map_err(|_| {
        Error::task_source(format!(
            "Task {} has invalid {}: {}",
            arn, PRIVATE_IPV4_DETAIL, value
        ))
    })
}

#[async_trait]
impl TaskSource for EcsTaskSource {
    async fn list_task_ips(&self, cluster_id: &str) -> Result<Vec<Ipv4Addr>> {
        let arns = self.list_task_arns(cluster_id).await?;

        // DescribeTasks rejects an empty task list.
        if arns.is_empty() {
            tracing::debug!("No running tasks in cluster {}", cluster_id);
            return Ok(Vec::new());
        }

        let tasks = self.describe_tasks(cluster_id, &arns).await?;
        let ips = tasks.iter().map(private_ipv4).collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Cluster {}: {} running task(s), {} address(es)",
            cluster_id,
            arns.len(),
            ips.len()
        );

        Ok(ips)
    }

    fn source_name(&self) -> &'static str {
        "ecs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ecs::types::{Attachment, KeyValuePair};

    fn detail(name: &str, value: &str) -> KeyValuePair {
        KeyValuePair::builder().name(name).value(value).build()
    }

    fn eni(ip: &str) -> Attachment {
        Attachment::builder()
            .r#type(ENI_ATTACHMENT_TYPE)
            .details(detail("subnetId", "subnet-0abc"))
            .details(detail(PRIVATE_IPV4_DETAIL, ip))
            .build()
    }

    #[test]
    fn test_extracts_private_ip() {
        let task = Task::builder()
            .task_arn("arn:aws:ecs:us-east-1:123:task/prod/abc")
            .attachments(eni("10.0.3.17"))
            .build();

        assert_eq!(private_ipv4(&task).unwrap(), Ipv4Addr::new(10, 0, 3, 17));
    }

    #[test]
    fn test_matches_attachment_by_type_not_position() {
        let other = Attachment::builder()
            .r#type("ServiceConnect")
            .details(detail(PRIVATE_IPV4_DETAIL, "192.168.0.1"))
            .build();

        let task = Task::builder()
            .task_arn("arn:aws:ecs:us-east-1:123:task/prod/abc")
            .attachments(other)
            .attachments(eni("10.0.3.18"))
            .build();

        assert_eq!(private_ipv4(&task).unwrap(), Ipv4Addr::new(10, 0, 3, 18));
    }

    #[test]
    fn test_missing_attachment_is_error() {
        let task = Task::builder()
            .task_arn("arn:aws:ecs:us-east-1:123:task/prod/noeni")
            .build();

        let err = private_ipv4(&task).unwrap_err();
        assert!(err.to_string().contains("noeni"));
    }

    #[test]
    fn test_missing_detail_is_error() {
        let attachment = Attachment::builder()
            .r#type(ENI_ATTACHMENT_TYPE)
            .details(detail("subnetId", "subnet-0abc"))
            .build();
        let task = Task::builder().attachments(attachment).build();

        let err = private_ipv4(&task).unwrap_err();
        assert!(err.to_string().contains(PRIVATE_IPV4_DETAIL));
    }

    #[test]
    fn test_invalid_address_is_error() {
        let task = Task::builder().attachments(eni("not-an-ip")).build();
        assert!(private_ipv4(&task).is_err());
    }

    mod paging {
        use super::*;
        use aws_sdk_ecs::operation::describe_tasks::DescribeTasksOutput;
        use aws_sdk_ecs::operation::list_tasks::{ListTasksError, ListTasksOutput};
        use aws_sdk_ecs::types::Failure;
        use aws_sdk_ecs::types::error::ClusterNotFoundException;
        use aws_smithy_mocks::{RuleMode, mock, mock_client};

        fn arn(i: usize) -> String {
            format!("arn:aws:ecs:us-east-1:123:task/prod/{:04}", i)
        }

        fn running_task(i: usize) -> Task {
            Task::builder()
                .task_arn(arn(i))
                .attachments(eni(&Ipv4Addr::from(0x0a00_0000 + i as u32).to_string()))
                .build()
        }

        #[tokio::test]
        async fn test_lists_all_pages_and_describes_in_batches() {
            let first_page = mock!(Client::list_tasks)
                .match_requests(|req| {
                    req.cluster() == Some("prod")
                        && req.desired_status() == Some(&DesiredStatus::Running)
                        && req.next_token().is_none()
                })
                .then_output(|| {
                    ListTasksOutput::builder()
                        .set_task_arns(Some((0..60).map(arn).collect()))
                        .next_token("page-2")
                        .build()
                });
            let second_page = mock!(Client::list_tasks)
                .match_requests(|req| req.next_token() == Some("page-2"))
                .then_output(|| {
                    ListTasksOutput::builder()
                        .set_task_arns(Some((60..101).map(arn).collect()))
                        .build()
                });
            let full_batch = mock!(Client::describe_tasks)
                .match_requests(|req| req.tasks().len() == 100 && req.tasks()[0] == arn(0))
                .then_output(|| {
                    DescribeTasksOutput::builder()
                        .set_tasks(Some((0..100).map(running_task).collect()))
                        .build()
                });
            let remainder = mock!(Client::describe_tasks)
                .match_requests(|req| req.tasks() == [arn(100)].as_slice())
                .then_output(|| {
                    DescribeTasksOutput::builder()
                        .tasks(running_task(100))
                        .build()
                });

            let client = mock_client!(
                aws_sdk_ecs,
                RuleMode::Sequential,
                [&first_page, &second_page, &full_batch, &remainder]
            );
            let source = EcsTaskSource::new(client);

            let ips = source.list_task_ips("prod").await.unwrap();

            assert_eq!(first_page.num_calls(), 1);
            assert_eq!(second_page.num_calls(), 1);
            assert_eq!(full_batch.num_calls(), 1);
            assert_eq!(remainder.num_calls(), 1);
            assert_eq!(ips.len(), 101);
            assert_eq!(ips[0], Ipv4Addr::new(10, 0, 0, 0));
            assert_eq!(ips[100], Ipv4Addr::new(10, 0, 0, 100));
        }

        #[tokio::test]
        async fn test_describe_failures_are_skipped() {
            let list = mock!(Client::list_tasks).then_output(|| {
                ListTasksOutput::builder()
                    .task_arns(arn(1))
                    .task_arns(arn(2))
                    .build()
            });
            let describe = mock!(Client::describe_tasks).then_output(|| {
                DescribeTasksOutput::builder()
                    .tasks(running_task(1))
                    .failures(Failure::builder().arn(arn(2)).reason("MISSING").build())
                    .build()
            });

            let client = mock_client!(aws_sdk_ecs, RuleMode::Sequential, [&list, &describe]);
            let source = EcsTaskSource::new(client);

            let ips = source.list_task_ips("prod").await.unwrap();

            assert_eq!(ips, vec![Ipv4Addr::new(10, 0, 0, 1)]);
        }

        #[tokio::test]
        async fn test_empty_cluster_skips_describe() {
            let list = mock!(Client::list_tasks).then_output(|| ListTasksOutput::builder().build());
            let describe = mock!(Client::describe_tasks)
                .then_output(|| DescribeTasksOutput::builder().build());

            let client = mock_client!(aws_sdk_ecs, RuleMode::MatchAny, [&list, &describe]);
            let source = EcsTaskSource::new(client);

            let ips = source.list_task_ips("prod").await.unwrap();

            assert!(ips.is_empty());
            assert_eq!(describe.num_calls(), 0);
        }

        #[tokio::test]
        async fn test_list_failure_is_error() {
            let list = mock!(Client::list_tasks).then_error(|| {
                ListTasksError::ClusterNotFoundException(
                    ClusterNotFoundException::builder()
                        .message("Cluster not found.")
                        .build(),
                )
            });

            let client = mock_client!(aws_sdk_ecs, RuleMode::Sequential, [&list]);
            let source = EcsTaskSource::new(client);

            let err = source.list_task_ips("missing").await.unwrap_err();

            assert!(err.to_string().contains("ListTasks failed for cluster missing"));
        }
    }

    #[test]
    fn test_source_name() {
        let config = aws_sdk_ecs::Config::builder()
            .behavior_version(aws_sdk_ecs::config::BehaviorVersion::latest())
            .region(aws_sdk_ecs::config::Region::new("us-east-1"))
            .build();
        let source = EcsTaskSource::new(Client::from_conf(config));

        assert_eq!(source.source_name(), "ecs");
    }
}
