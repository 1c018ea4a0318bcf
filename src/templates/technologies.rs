//! Built-in dependency-technology templates.
//!
//! Panels flagged `overview()` make up the compact dependency rows; full mode
//! renders every panel.

use crate::templates::intent::MetricIntent;
use crate::templates::template::{PanelTemplate, Template, ThresholdStep};

pub fn all() -> Vec<Template> {
    vec![
        postgresql(),
        timescaledb(),
        mysql(),
        mongodb(),
        redis(),
        valkey(),
        kafka(),
        rabbitmq(),
        elasticsearch(),
        kubernetes(),
    ]
}

fn ratio_thresholds(warn: f64, ok: f64) -> Vec<ThresholdStep> {
    vec![
        ThresholdStep::base("red"),
        ThresholdStep::at("yellow", warn),
        ThresholdStep::at("green", ok),
    ]
}

fn postgresql() -> Template {
    Template::technology("postgresql", "PostgreSQL")
        .aliases(&["postgres", "pg", "aurora-postgresql"])
        .intent(
            MetricIntent::gauge("postgresql.connections", "{connection}")
                .candidates(["pg_stat_activity_count", "pg_stat_database_numbackends"])
                .attribute("datname", false, &["orders"]),
        )
        .intent(
            MetricIntent::gauge("postgresql.connections.max", "{connection}")
                .candidates(["pg_settings_max_connections"]),
        )
        .intent(
            MetricIntent::counter("postgresql.commits", "{transaction}")
                .candidates(["pg_stat_database_xact_commit", "pg_stat_database_xact_commit_total"]),
        )
        .intent(
            MetricIntent::counter("postgresql.rollbacks", "{transaction}")
                .candidates(["pg_stat_database_xact_rollback", "pg_stat_database_xact_rollback_total"]),
        )
        .intent(
            MetricIntent::counter("postgresql.blocks.hit", "{block}")
                .recommended()
                .candidates(["pg_stat_database_blks_hit", "pg_stat_database_blks_hit_total"]),
        )
        .intent(
            MetricIntent::counter("postgresql.blocks.read", "{block}")
                .recommended()
                .candidates(["pg_stat_database_blks_read", "pg_stat_database_blks_read_total"]),
        )
        .intent(
            MetricIntent::counter("postgresql.deadlocks", "{deadlock}")
                .recommended()
                .candidates(["pg_stat_database_deadlocks", "pg_stat_database_deadlocks_total"]),
        )
        .intent(
            MetricIntent::gauge("postgresql.replication.lag", "s")
                .recommended()
                .candidates(["pg_replication_lag_seconds", "pg_replication_lag"]),
        )
        .intent(
            MetricIntent::gauge("postgresql.database.size", "By")
                .recommended()
                .candidates(["pg_database_size_bytes"]),
        )
        .panel(
            PanelTemplate::timeseries("Connections")
                .unit("short")
                .overview()
                .query(r#"sum({{postgresql.connections}}{service="$service"})"#, "active")
                .query(r#"max({{postgresql.connections.max}}{service="$service"})"#, "max"),
        )
        .panel(
            PanelTemplate::timeseries("Transactions")
                .unit("ops")
                .overview()
                .query(r#"sum(rate({{postgresql.commits}}{service="$service"}[5m]))"#, "commits")
                .query(r#"sum(rate({{postgresql.rollbacks}}{service="$service"}[5m]))"#, "rollbacks"),
        )
        .panel(
            PanelTemplate::gauge("Cache Hit Ratio")
                .unit("percent")
                .decimals(1)
                .range(0.0, 100.0)
                .thresholds(ratio_thresholds(90.0, 99.0))
                .overview()
                .query(
                    r#"sum(rate({{postgresql.blocks.hit}}{service="$service"}[5m])) / (sum(rate({{postgresql.blocks.hit}}{service="$service"}[5m])) + sum(rate({{postgresql.blocks.read}}{service="$service"}[5m]))) * 100"#,
                    "hit ratio",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Deadlocks")
                .unit("short")
                .query(r#"sum(increase({{postgresql.deadlocks}}{service="$service"}[5m]))"#, "deadlocks"),
        )
        .panel(
            PanelTemplate::timeseries("Replication Lag")
                .unit("s")
                .query(r#"max({{postgresql.replication.lag}}{service="$service"})"#, "lag")
                .guidance("Enable the replication collector in postgres_exporter to chart replica lag."),
        )
        .panel(
            PanelTemplate::stat("Database Size")
                .unit("bytes")
                .query(r#"sum({{postgresql.database.size}}{service="$service"})"#, "size"),
        )
}

/// TimescaleDB is PostgreSQL plus hypertable bookkeeping.
fn timescaledb() -> Template {
    Template::technology("timescaledb", "TimescaleDB")
        .extends("postgresql")
        .aliases(&["timescale"])
        .intent(
            MetricIntent::gauge("timescaledb.hypertable.chunks", "{chunk}")
                .technology_group("postgresql")
                .candidates(["timescaledb_hypertable_chunks"]),
        )
        .panel(
            PanelTemplate::stat("Hypertable Chunks")
                .unit("short")
                .overview()
                .query(r#"sum({{timescaledb.hypertable.chunks}}{service="$service"})"#, "chunks"),
        )
}

fn mysql() -> Template {
    Template::technology("mysql", "MySQL")
        .aliases(&["mariadb", "aurora-mysql"])
        .intent(
            MetricIntent::gauge("mysql.connections", "{connection}")
                .candidates(["mysql_global_status_threads_connected"]),
        )
        .intent(
            MetricIntent::gauge("mysql.connections.max", "{connection}")
                .candidates(["mysql_global_variables_max_connections"]),
        )
        .intent(
            MetricIntent::counter("mysql.queries", "{query}")
                .candidates(["mysql_global_status_queries", "mysql_global_status_questions"]),
        )
        .intent(
            MetricIntent::counter("mysql.slow_queries", "{query}")
                .candidates(["mysql_global_status_slow_queries"]),
        )
        .intent(
            MetricIntent::counter("mysql.buffer_pool.read_requests", "{request}")
                .recommended()
                .candidates(["mysql_global_status_innodb_buffer_pool_read_requests"]),
        )
        .intent(
            MetricIntent::counter("mysql.buffer_pool.reads", "{read}")
                .recommended()
                .candidates(["mysql_global_status_innodb_buffer_pool_reads"]),
        )
        .intent(
            MetricIntent::gauge("mysql.replication.lag", "s")
                .recommended()
                .candidates([
                    "mysql_slave_status_seconds_behind_master",
                    "mysql_replica_status_seconds_behind_source",
                ]),
        )
        .panel(
            PanelTemplate::timeseries("Connections")
                .unit("short")
                .overview()
                .query(r#"sum({{mysql.connections}}{service="$service"})"#, "connected")
                .query(r#"max({{mysql.connections.max}}{service="$service"})"#, "max"),
        )
        .panel(
            PanelTemplate::timeseries("Query Rate")
                .unit("qps")
                .overview()
                .query(r#"sum(rate({{mysql.queries}}{service="$service"}[5m]))"#, "queries/s"),
        )
        .panel(
            PanelTemplate::stat("Slow Queries")
                .unit("short")
                .overview()
                .thresholds(vec![ThresholdStep::base("green"), ThresholdStep::at("red", 1.0)])
                .query(r#"sum(increase({{mysql.slow_queries}}{service="$service"}[1h]))"#, "slow/h"),
        )
        .panel(
            PanelTemplate::gauge("Buffer Pool Hit Ratio")
                .unit("percent")
                .decimals(1)
                .range(0.0, 100.0)
                .thresholds(ratio_thresholds(95.0, 99.0))
                .query(
                    r#"(1 - sum(rate({{mysql.buffer_pool.reads}}{service="$service"}[5m])) / sum(rate({{mysql.buffer_pool.read_requests}}{service="$service"}[5m]))) * 100"#,
                    "hit ratio",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Replication Lag")
                .unit("s")
                .query(r#"max({{mysql.replication.lag}}{service="$service"})"#, "lag")
                .guidance("Enable the replica status collector in mysqld_exporter to chart replication lag."),
        )
}

fn mongodb() -> Template {
    Template::technology("mongodb", "MongoDB")
        .aliases(&["mongo", "documentdb"])
        .intent(
            MetricIntent::gauge("mongodb.connections", "{connection}")
                .candidates(["mongodb_connections", "mongodb_ss_connections"])
                .attribute("state", true, &["current", "available"]),
        )
        .intent(
            MetricIntent::counter("mongodb.operations", "{operation}")
                .candidates(["mongodb_op_counters_total", "mongodb_ss_opcounters"])
                .attribute("type", true, &["query", "insert"]),
        )
        .intent(
            MetricIntent::gauge("mongodb.replication.lag", "s")
                .recommended()
                .candidates(["mongodb_mongod_replset_member_replication_lag"]),
        )
        .intent(
            MetricIntent::gauge("mongodb.memory.resident", "MiBy")
                .recommended()
                .candidates(["mongodb_memory", "mongodb_ss_mem_resident"]),
        )
        .panel(
            PanelTemplate::timeseries("Connections")
                .unit("short")
                .overview()
                .query(r#"sum({{mongodb.connections}}{service="$service",state="current"})"#, "current"),
        )
        .panel(
            PanelTemplate::timeseries("Operations")
                .unit("ops")
                .overview()
                .query(r#"sum by (type) (rate({{mongodb.operations}}{service="$service"}[5m]))"#, "{{type}}"),
        )
        .panel(
            PanelTemplate::timeseries("Replication Lag")
                .unit("s")
                .query(r#"max({{mongodb.replication.lag}}{service="$service"})"#, "lag"),
        )
        .panel(
            PanelTemplate::stat("Resident Memory")
                .unit("mbytes")
                .query(r#"sum({{mongodb.memory.resident}}{service="$service"})"#, "resident"),
        )
}

fn redis() -> Template {
    Template::technology("redis", "Redis")
        .aliases(&["elasticache", "redis-cluster"])
        .intent(
            MetricIntent::gauge("redis.clients", "{client}").candidates(["redis_connected_clients"]),
        )
        .intent(
            MetricIntent::gauge("redis.memory.used", "By").candidates(["redis_memory_used_bytes"]),
        )
        .intent(
            MetricIntent::gauge("redis.memory.max", "By")
                .recommended()
                .candidates(["redis_memory_max_bytes"]),
        )
        .intent(
            MetricIntent::counter("redis.keyspace.hits", "{hit}")
                .candidates(["redis_keyspace_hits_total", "redis_keyspace_hits"]),
        )
        .intent(
            MetricIntent::counter("redis.keyspace.misses", "{miss}")
                .candidates(["redis_keyspace_misses_total", "redis_keyspace_misses"]),
        )
        .intent(
            MetricIntent::counter("redis.commands", "{command}")
                .recommended()
                .candidates(["redis_commands_processed_total"]),
        )
        .intent(
            MetricIntent::counter("redis.evictions", "{key}")
                .recommended()
                .candidates(["redis_evicted_keys_total"]),
        )
        .panel(
            PanelTemplate::gauge("Cache Hit Ratio")
                .unit("percent")
                .decimals(1)
                .range(0.0, 100.0)
                .thresholds(ratio_thresholds(80.0, 95.0))
                .overview()
                .query(
                    r#"sum(rate({{redis.keyspace.hits}}{service="$service"}[5m])) / (sum(rate({{redis.keyspace.hits}}{service="$service"}[5m])) + sum(rate({{redis.keyspace.misses}}{service="$service"}[5m]))) * 100"#,
                    "hit ratio",
                ),
        )
        .panel(
            PanelTemplate::timeseries("Memory Usage")
                .unit("bytes")
                .overview()
                .query(r#"sum({{redis.memory.used}}{service="$service"})"#, "used")
                .query(r#"sum({{redis.memory.max}}{service="$service"})"#, "max"),
        )
        .panel(
            PanelTemplate::stat("Connected Clients")
                .unit("short")
                .overview()
                .query(r#"sum({{redis.clients}}{service="$service"})"#, "clients"),
        )
        .panel(
            PanelTemplate::timeseries("Commands")
                .unit("ops")
                .query(r#"sum(rate({{redis.commands}}{service="$service"}[5m]))"#, "commands/s"),
        )
        .panel(
            PanelTemplate::timeseries("Evictions")
                .unit("short")
                .query(r#"sum(rate({{redis.evictions}}{service="$service"}[5m]))"#, "evicted/s"),
        )
}

/// Valkey speaks the Redis protocol and is scraped by the same exporter.
fn valkey() -> Template {
    Template::technology("valkey", "Valkey").extends("redis")
}

fn kafka() -> Template {
    Template::technology("kafka", "Kafka")
        .aliases(&["msk", "apache-kafka", "redpanda"])
        .intent(
            MetricIntent::gauge("kafka.consumer.lag", "{message}")
                .candidates(["kafka_consumergroup_lag", "kafka_consumer_lag"])
                .attribute("consumergroup", true, &["payment-api"]),
        )
        .intent(
            MetricIntent::counter("kafka.messages.in", "{message}")
                .candidates(["kafka_server_brokertopicmetrics_messagesin_total"]),
        )
        .intent(
            MetricIntent::gauge("kafka.partitions.under_replicated", "{partition}")
                .recommended()
                .candidates([
                    "kafka_server_replicamanager_underreplicatedpartitions",
                    "kafka_topic_partition_under_replicated_partition",
                ]),
        )
        .intent(
            MetricIntent::gauge("kafka.brokers", "{broker}")
                .recommended()
                .candidates(["kafka_brokers"]),
        )
        .panel(
            PanelTemplate::timeseries("Consumer Lag")
                .unit("short")
                .overview()
                .query(r#"sum by (topic) ({{kafka.consumer.lag}}{consumergroup="$service"})"#, "{{topic}}"),
        )
        .panel(
            PanelTemplate::timeseries("Messages In")
                .unit("ops")
                .overview()
                .query(r#"sum(rate({{kafka.messages.in}}[5m]))"#, "messages/s"),
        )
        .panel(
            PanelTemplate::stat("Under-Replicated Partitions")
                .unit("short")
                .thresholds(vec![ThresholdStep::base("green"), ThresholdStep::at("red", 1.0)])
                .query(r#"sum({{kafka.partitions.under_replicated}})"#, "partitions"),
        )
        .panel(
            PanelTemplate::stat("Brokers")
                .unit("short")
                .query(r#"max({{kafka.brokers}})"#, "brokers"),
        )
}

fn rabbitmq() -> Template {
    Template::technology("rabbitmq", "RabbitMQ")
        .aliases(&["amqp", "rabbit"])
        .intent(
            MetricIntent::gauge("rabbitmq.messages.ready", "{message}")
                .candidates(["rabbitmq_queue_messages_ready"]),
        )
        .intent(
            MetricIntent::gauge("rabbitmq.messages.unacked", "{message}")
                .candidates(["rabbitmq_queue_messages_unacked", "rabbitmq_queue_messages_unacknowledged"]),
        )
        .intent(
            MetricIntent::counter("rabbitmq.messages.published", "{message}")
                .candidates([
                    "rabbitmq_channel_messages_published_total",
                    "rabbitmq_global_messages_received_total",
                ]),
        )
        .intent(
            MetricIntent::gauge("rabbitmq.consumers", "{consumer}")
                .recommended()
                .candidates(["rabbitmq_queue_consumers"]),
        )
        .intent(
            MetricIntent::gauge("rabbitmq.connections", "{connection}")
                .recommended()
                .candidates(["rabbitmq_connections"]),
        )
        .panel(
            PanelTemplate::timeseries("Queue Depth")
                .unit("short")
                .overview()
                .query(r#"sum({{rabbitmq.messages.ready}}{service="$service"})"#, "ready")
                .query(r#"sum({{rabbitmq.messages.unacked}}{service="$service"})"#, "unacked"),
        )
        .panel(
            PanelTemplate::timeseries("Publish Rate")
                .unit("ops")
                .overview()
                .query(r#"sum(rate({{rabbitmq.messages.published}}{service="$service"}[5m]))"#, "published/s"),
        )
        .panel(
            PanelTemplate::stat("Consumers")
                .unit("short")
                .query(r#"sum({{rabbitmq.consumers}}{service="$service"})"#, "consumers"),
        )
        .panel(
            PanelTemplate::stat("Connections")
                .unit("short")
                .query(r#"sum({{rabbitmq.connections}}{service="$service"})"#, "connections"),
        )
}

fn elasticsearch() -> Template {
    Template::technology("elasticsearch", "Elasticsearch")
        .aliases(&["opensearch", "elastic"])
        .intent(
            MetricIntent::gauge("elasticsearch.cluster.status", "1")
                .candidates(["elasticsearch_cluster_health_status"])
                .attribute("color", true, &["green", "yellow", "red"]),
        )
        .intent(
            MetricIntent::counter("elasticsearch.search.queries", "{query}")
                .candidates(["elasticsearch_indices_search_query_total"]),
        )
        .intent(
            MetricIntent::counter("elasticsearch.search.time", "s")
                .candidates(["elasticsearch_indices_search_query_time_seconds"]),
        )
        .intent(
            MetricIntent::gauge("elasticsearch.jvm.heap.used", "By")
                .recommended()
                .candidates(["elasticsearch_jvm_memory_used_bytes"]),
        )
        .intent(
            MetricIntent::gauge("elasticsearch.jvm.heap.max", "By")
                .recommended()
                .candidates(["elasticsearch_jvm_memory_max_bytes"]),
        )
        .panel(
            PanelTemplate::stat("Cluster Health")
                .overview()
                .thresholds(vec![ThresholdStep::base("red"), ThresholdStep::at("green", 1.0)])
                .query(r#"max({{elasticsearch.cluster.status}}{service="$service",color="green"})"#, "green"),
        )
        .panel(
            PanelTemplate::timeseries("Search Rate")
                .unit("qps")
                .overview()
                .query(r#"sum(rate({{elasticsearch.search.queries}}{service="$service"}[5m]))"#, "queries/s"),
        )
        .panel(
            PanelTemplate::timeseries("Search Latency")
                .unit("ms")
                .query(
                    r#"sum(rate({{elasticsearch.search.time}}{service="$service"}[5m])) / sum(rate({{elasticsearch.search.queries}}{service="$service"}[5m])) * 1000"#,
                    "avg",
                ),
        )
        .panel(
            PanelTemplate::gauge("JVM Heap Usage")
                .unit("percent")
                .range(0.0, 100.0)
                .thresholds(vec![
                    ThresholdStep::base("green"),
                    ThresholdStep::at("yellow", 75.0),
                    ThresholdStep::at("red", 90.0),
                ])
                .query(
                    r#"sum({{elasticsearch.jvm.heap.used}}{service="$service"}) / sum({{elasticsearch.jvm.heap.max}}{service="$service"}) * 100"#,
                    "heap",
                ),
        )
}

fn kubernetes() -> Template {
    Template::technology("kubernetes", "Kubernetes")
        .aliases(&["k8s", "eks", "gke", "aks"])
        .intent(
            MetricIntent::gauge("kubernetes.deployment.replicas.available", "{replica}")
                .candidates(["kube_deployment_status_replicas_available"]),
        )
        .intent(
            MetricIntent::gauge("kubernetes.deployment.replicas.desired", "{replica}")
                .candidates(["kube_deployment_spec_replicas"]),
        )
        .intent(
            MetricIntent::counter("kubernetes.pod.restarts", "{restart}")
                .candidates(["kube_pod_container_status_restarts_total"]),
        )
        .intent(
            MetricIntent::counter("kubernetes.container.cpu", "s")
                .recommended()
                .candidates(["container_cpu_usage_seconds_total"]),
        )
        .intent(
            MetricIntent::gauge("kubernetes.container.memory", "By")
                .recommended()
                .candidates(["container_memory_working_set_bytes"]),
        )
        .panel(
            PanelTemplate::timeseries("Replicas")
                .unit("short")
                .overview()
                .query(r#"sum({{kubernetes.deployment.replicas.available}}{deployment="$service"})"#, "available")
                .query(r#"sum({{kubernetes.deployment.replicas.desired}}{deployment="$service"})"#, "desired"),
        )
        .panel(
            PanelTemplate::timeseries("Pod Restarts")
                .unit("short")
                .overview()
                .query(r#"sum(increase({{kubernetes.pod.restarts}}{pod=~"$service-.*"}[15m]))"#, "restarts"),
        )
        .panel(
            PanelTemplate::timeseries("CPU Usage")
                .unit("short")
                .query(r#"sum(rate({{kubernetes.container.cpu}}{pod=~"$service-.*",container!=""}[5m]))"#, "cores"),
        )
        .panel(
            PanelTemplate::timeseries("Memory Usage")
                .unit("bytes")
                .query(r#"sum({{kubernetes.container.memory}}{pod=~"$service-.*",container!=""})"#, "working set"),
        )
}
