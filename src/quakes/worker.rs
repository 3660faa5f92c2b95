use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use bevy_tasks::futures_lite::future;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::{Arc, Mutex};

use crate::config::MapConfig;
use crate::geojson::{ParsedFeed, parse_plates, parse_quakes};
use crate::types::{PlateBoundary, Quake};

use super::{FeedClient, FeedError, FeedKind};

#[derive(Debug, Clone, PartialEq)]
pub struct FeedRequest {
    pub generation: u64,
    pub kind: FeedKind,
    pub url: String,
}

#[derive(Debug)]
pub enum FeedPayload {
    Quakes(ParsedFeed<Quake>),
    Plates(ParsedFeed<PlateBoundary>),
}

#[derive(Debug)]
pub struct FeedMessage {
    pub generation: u64,
    pub kind: FeedKind,
    pub result: Result<FeedPayload, FeedError>,
}

#[derive(Resource)]
pub struct FeedWorker {
    client: FeedClient,
    pending_requests: Arc<Mutex<Vec<FeedRequest>>>,
    max_concurrent: usize,
    active_tasks: Arc<Mutex<usize>>,
    tx: Sender<FeedMessage>,
}

#[derive(Resource, Deref)]
pub struct FeedReceiver(pub Receiver<FeedMessage>);

impl FeedWorker {
    pub fn new(client: FeedClient, max_workers: usize) -> (Self, FeedReceiver) {
        let (tx, rx) = unbounded();
        let worker = FeedWorker {
            client,
            pending_requests: Arc::new(Mutex::new(Vec::new())),
            max_concurrent: max_workers,
            active_tasks: Arc::new(Mutex::new(0)),
            tx,
        };
        (worker, FeedReceiver(rx))
    }

    pub fn queue_request(&self, request: FeedRequest) {
        match self.pending_requests.lock() {
            Ok(mut pending) => pending.push(request),
            Err(e) => error!("Feed queue poisoned: {}", e),
        }
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> Vec<FeedRequest> {
        self.pending_requests
            .lock()
            .map(|pending| pending.clone())
            .unwrap_or_default()
    }

    fn next_request(&self) -> Option<FeedRequest> {
        let active = self.active_tasks.lock().map(|a| *a).unwrap_or(usize::MAX);
        if active >= self.max_concurrent {
            return None;
        }
        let mut requests = self.pending_requests.lock().ok()?;
        if requests.is_empty() {
            None
        } else {
            Some(requests.remove(0))
        }
    }
}

/// Downloads and decodes one feed. Runs on the compute pool.
pub fn run_request(client: &FeedClient, request: &FeedRequest) -> Result<FeedPayload, FeedError> {
    let geojson = client.fetch_geojson(&request.url)?;
    match request.kind {
        FeedKind::Earthquakes => Ok(FeedPayload::Quakes(parse_quakes(geojson)?)),
        FeedKind::Plates => Ok(FeedPayload::Plates(parse_plates(geojson)?)),
    }
}

pub fn process_requests(mut commands: Commands, worker: Res<FeedWorker>) {
    let Some(request) = worker.next_request() else {
        return;
    };
    if let Ok(mut active) = worker.active_tasks.lock() {
        *active += 1;
    }

    let task_pool = AsyncComputeTaskPool::get();
    let active_tasks = worker.active_tasks.clone();
    let client = worker.client.clone();
    let tx = worker.tx.clone();
    info!("Fetching {} from {}", request.kind, request.url);

    let task = task_pool.spawn(async move {
        let result = run_request(&client, &request);
        let message = FeedMessage {
            generation: request.generation,
            kind: request.kind,
            result,
        };
        if tx.send(message).is_err() {
            warn!("Feed receiver dropped before {} arrived", request.kind);
        }

        if let Ok(mut active) = active_tasks.lock() {
            *active -= 1;
        }
    });

    commands.spawn(TaskComponent(task));
}

#[derive(Component)]
struct TaskComponent(Task<()>);

fn cleanup_tasks(mut commands: Commands, mut tasks: Query<(Entity, &mut TaskComponent)>) {
    for (entity, mut task) in tasks.iter_mut() {
        if future::block_on(future::poll_once(&mut task.0)).is_some() {
            commands.entity(entity).despawn();
        }
    }
}

pub struct FeedWorkerPlugin;

impl Plugin for FeedWorkerPlugin {
    fn build(&self, app: &mut App) {
        let client = FeedClient::from_config(app.world().resource::<MapConfig>());
        let (worker, receiver) = FeedWorker::new(client, 1);
        app.insert_resource(worker)
            .insert_resource(receiver)
            .add_systems(Update, (process_requests, cleanup_tasks));
    }
}
