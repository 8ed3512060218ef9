use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use dealdesk_core::{AggregateId, ContactId, ExpectedVersion, Patch, UserId, WorkspaceId};
use dealdesk_events::{EventEnvelope, InMemoryEventBus};
use dealdesk_infra::command_dispatcher::CommandDispatcher;
use dealdesk_infra::event_store::{EventStore, InMemoryEventStore, StreamAppend, UncommittedEvent};
use dealdesk_rfq::{CreateRfq, Rfq, RfqCommand, RfqEvent, RfqId, RfqUpdated, UpdateRfq};
use std::collections::HashSet;
use std::sync::Arc;

type Bus = InMemoryEventBus<EventEnvelope<serde_json::Value>>;

fn setup_dispatcher() -> CommandDispatcher<Arc<InMemoryEventStore>, Arc<Bus>> {
    CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(Bus::new()))
}

fn create_cmd(rfq_id: RfqId) -> RfqCommand {
    RfqCommand::CreateRfq(CreateRfq {
        rfq_id,
        buyers_workspace_id: WorkspaceId::new(),
        invited_seller_contact_ids: HashSet::from([ContactId::new()]),
        line_items: Vec::new(),
        response_deadline: None,
        created_by: UserId::new(),
        occurred_at: Utc::now(),
    })
}

fn replace_sellers_cmd(rfq_id: RfqId) -> RfqCommand {
    RfqCommand::UpdateRfq(UpdateRfq {
        rfq_id,
        status: None,
        invited_seller_contact_ids: Some(HashSet::from([ContactId::new(), ContactId::new()])),
        line_items: None,
        response_deadline: Patch::Omitted,
        updated_by: UserId::new(),
        occurred_at: Utc::now(),
    })
}

fn update_event(rfq_id: RfqId) -> RfqEvent {
    RfqEvent::RfqUpdated(RfqUpdated {
        rfq_id,
        status: None,
        invited_seller_contact_ids: Some(HashSet::from([ContactId::new()])),
        line_items: None,
        response_deadline: Patch::Omitted,
        updated_by: UserId::new(),
        occurred_at: Utc::now(),
    })
}

fn uncommitted(rfq_id: RfqId) -> UncommittedEvent {
    UncommittedEvent::from_typed(rfq_id.0, "rfq", uuid::Uuid::now_v7(), &update_event(rfq_id))
        .unwrap()
}

fn bench_command_execution_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_execution_latency");
    group.sample_size(1000);

    // First command, no history.
    group.bench_function("create_rfq_fresh", |b| {
        let dispatcher = setup_dispatcher();
        b.iter(|| {
            let rfq_id = RfqId::new(AggregateId::new());
            dispatcher
                .dispatch(rfq_id.0, "rfq", black_box(create_cmd(rfq_id)), |id| {
                    Rfq::empty(RfqId::new(id))
                })
                .unwrap();
        });
    });

    // Update after creation; the rehydrated history grows with every iteration.
    group.bench_function("update_rfq_with_history", |b| {
        let dispatcher = setup_dispatcher();
        let rfq_id = RfqId::new(AggregateId::new());
        dispatcher
            .dispatch(rfq_id.0, "rfq", create_cmd(rfq_id), |id| {
                Rfq::empty(RfqId::new(id))
            })
            .unwrap();

        b.iter(|| {
            dispatcher
                .dispatch(rfq_id.0, "rfq", black_box(replace_sellers_cmd(rfq_id)), |id| {
                    Rfq::empty(RfqId::new(id))
                })
                .unwrap();
        });
    });

    group.finish();
}

fn bench_event_append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_append_throughput");

    for batch_size in [1usize, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("batch_append", batch_size),
            batch_size,
            |b, &size| {
                let store = InMemoryEventStore::new();
                let rfq_id = RfqId::new(AggregateId::new());

                b.iter(|| {
                    let events: Vec<UncommittedEvent> =
                        (0..size).map(|_| uncommitted(rfq_id)).collect();
                    black_box(store.append(events, ExpectedVersion::Any).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_transaction_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction_commit");

    for stream_count in [2usize, 5, 10].iter() {
        group.throughput(Throughput::Elements(*stream_count as u64));
        group.bench_with_input(
            BenchmarkId::new("multi_stream", stream_count),
            stream_count,
            |b, &count| {
                let store = InMemoryEventStore::new();

                b.iter(|| {
                    let batches: Vec<StreamAppend> = (0..count)
                        .map(|_| StreamAppend {
                            expected_version: ExpectedVersion::Exact(0),
                            events: vec![uncommitted(RfqId::new(AggregateId::new()))],
                        })
                        .collect();
                    black_box(store.append_transaction(batches).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_dispatch_vs_direct_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_vs_direct_append");
    group.sample_size(1000);

    // Full pipeline: load, rehydrate, handle, append, publish.
    group.bench_function("dispatch_pipeline", |b| {
        let dispatcher = setup_dispatcher();
        let rfq_id = RfqId::new(AggregateId::new());
        dispatcher
            .dispatch(rfq_id.0, "rfq", create_cmd(rfq_id), |id| {
                Rfq::empty(RfqId::new(id))
            })
            .unwrap();

        b.iter(|| {
            dispatcher
                .dispatch(rfq_id.0, "rfq", replace_sellers_cmd(rfq_id), |id| {
                    Rfq::empty(RfqId::new(id))
                })
                .unwrap();
        });
    });

    // Raw append without decision logic or publication.
    group.bench_function("direct_append", |b| {
        let store = InMemoryEventStore::new();
        let rfq_id = RfqId::new(AggregateId::new());

        b.iter(|| {
            black_box(
                store
                    .append(vec![uncommitted(rfq_id)], ExpectedVersion::Any)
                    .unwrap(),
            );
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_command_execution_latency,
    bench_event_append_throughput,
    bench_transaction_commit,
    bench_dispatch_vs_direct_append
);
criterion_main!(benches);
