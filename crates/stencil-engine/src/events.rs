//! Discovery notifications.
//!
//! Three independent channels (interface found, implementation found,
//! instantiation found). Each delivers a [`Discovery`] exactly once per unique
//! record per pass, in one of two ways:
//!
//! - [`Subscription`]s receive through an unbounded `crossbeam-channel`, so
//!   publishing never blocks on a slow consumer.
//! - Callback listeners run on the [`DispatchLane`], a single background
//!   thread. If the lane is disabled or cannot be started, each notification
//!   gets its own short-lived thread instead.
//!
//! There is no replay: a subscriber attached after a record was published
//! never sees it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use parking_lot::{Mutex, RwLock};
use stencil_core::{
    TemplateImplementationRecord, TemplateInstantiationRecord, TemplateInterfaceRecord,
};
use tracing::{debug, warn};

use crate::config::EngineConfig;

/// A record published by a discovery pass.
#[derive(Debug)]
pub struct Discovery<R> {
    /// Pass that discovered the record.
    pub pass: u64,
    pub record: Arc<R>,
}

impl<R> Clone for Discovery<R> {
    fn clone(&self) -> Self {
        Self {
            pass: self.pass,
            record: Arc::clone(&self.record),
        }
    }
}

/// Receiving end of one notification channel.
#[derive(Debug)]
pub struct Subscription<R> {
    receiver: Receiver<Discovery<R>>,
}

impl<R> Subscription<R> {
    /// Block until the next notification.
    pub fn recv(&self) -> Option<Discovery<R>> {
        self.receiver.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Discovery<R>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<Discovery<R>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything delivered so far, without blocking.
    pub fn drain(&self) -> Vec<Discovery<R>> {
        self.receiver.try_iter().collect()
    }

    pub fn receiver(&self) -> &Receiver<Discovery<R>> {
        &self.receiver
    }
}

type Listener<R> = Arc<dyn Fn(&Discovery<R>) + Send + Sync>;
type Job = Box<dyn FnOnce() + Send + 'static>;

/// One notification channel.
pub struct Channel<R> {
    subscribers: RwLock<Vec<Sender<Discovery<R>>>>,
    listeners: RwLock<Vec<Listener<R>>>,
}

impl<R> Default for Channel<R> {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<R> std::fmt::Debug for Channel<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.subscribers.read().len())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl<R: Send + Sync + 'static> Channel<R> {
    pub fn subscribe(&self) -> Subscription<R> {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        Subscription { receiver }
    }

    pub fn add_listener(&self, listener: impl Fn(&Discovery<R>) + Send + Sync + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver `event` to every subscriber and hand listeners to the lane.
    pub fn publish(&self, event: Discovery<R>, lane: &DispatchLane) {
        let mut dropped = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for sender in subscribers.iter() {
                if sender.send(event.clone()).is_err() {
                    dropped.push(sender.clone());
                }
            }
        }
        if !dropped.is_empty() {
            self.subscribers
                .write()
                .retain(|s| !dropped.iter().any(|d| d.same_channel(s)));
        }

        let listeners = self.listeners.read().clone();
        if !listeners.is_empty() {
            lane.dispatch(Box::new(move || {
                for listener in &listeners {
                    listener(&event);
                }
            }));
        }
    }
}

enum LaneMessage {
    Run(Job),
    Flush(Sender<()>),
}

/// Background delivery of callback notifications.
pub struct DispatchLane {
    sender: Mutex<Option<Sender<LaneMessage>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    ad_hoc: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for DispatchLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchLane")
            .field("running", &self.is_running())
            .finish()
    }
}

impl DispatchLane {
    pub fn new(config: &EngineConfig) -> Self {
        let lane = Self {
            sender: Mutex::new(None),
            thread: Mutex::new(None),
            ad_hoc: Mutex::new(Vec::new()),
        };
        if !config.dispatch_lane {
            return lane;
        }

        let (sender, receiver) = unbounded();
        match thread::Builder::new()
            .name(config.dispatch_thread_name.clone())
            .spawn(move || run_lane(receiver))
        {
            Ok(handle) => {
                *lane.sender.lock() = Some(sender);
                *lane.thread.lock() = Some(handle);
            }
            Err(err) => {
                warn!(error = %err, "could not start dispatch lane; using ad hoc threads");
            }
        }
        lane
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Run `job` off the calling thread.
    pub fn dispatch(&self, job: Job) {
        let job = match self.sender.lock().as_ref() {
            Some(sender) => match sender.send(LaneMessage::Run(job)) {
                Ok(()) => return,
                Err(crossbeam_channel::SendError(LaneMessage::Run(job))) => job,
                Err(_) => return,
            },
            None => job,
        };
        self.spawn_ad_hoc(job);
    }

    fn spawn_ad_hoc(&self, job: Job) {
        let slot = Arc::new(Mutex::new(Some(job)));
        let shared = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name("stencil-notify".to_string())
            .spawn(move || {
                if let Some(job) = shared.lock().take() {
                    run_job(job);
                }
            });
        match spawned {
            Ok(handle) => {
                let mut ad_hoc = self.ad_hoc.lock();
                ad_hoc.retain(|h| !h.is_finished());
                ad_hoc.push(handle);
            }
            Err(err) => {
                warn!(error = %err, "could not spawn notification thread; delivering inline");
                if let Some(job) = slot.lock().take() {
                    run_job(job);
                }
            }
        }
    }

    /// Wait until every notification dispatched so far has been delivered.
    pub fn flush(&self) {
        let ack = {
            let sender = self.sender.lock();
            sender.as_ref().and_then(|sender| {
                let (tx, rx) = unbounded();
                sender.send(LaneMessage::Flush(tx)).ok().map(|()| rx)
            })
        };
        if let Some(rx) = ack {
            let _ = rx.recv();
        }

        let handles: Vec<_> = self.ad_hoc.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }

    /// Stop the lane thread after it drains its queue. Later notifications
    /// fall back to ad hoc threads.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.thread.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for DispatchLane {
    fn drop(&mut self) {
        self.shutdown();
        for handle in self.ad_hoc.lock().drain(..) {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn run_lane(receiver: Receiver<LaneMessage>) {
    debug!("dispatch lane started");
    for message in receiver {
        match message {
            LaneMessage::Run(job) => run_job(job),
            LaneMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("dispatch lane stopped");
}

/// A panicking listener must not take the lane down with it.
fn run_job(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("discovery listener panicked");
    }
}

/// The three notification channels plus the lane that serves their listeners.
#[derive(Debug)]
pub struct EventHub {
    pub interfaces: Channel<TemplateInterfaceRecord>,
    pub implementations: Channel<TemplateImplementationRecord>,
    pub instantiations: Channel<TemplateInstantiationRecord>,
    lane: DispatchLane,
}

impl EventHub {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            interfaces: Channel::default(),
            implementations: Channel::default(),
            instantiations: Channel::default(),
            lane: DispatchLane::new(config),
        }
    }

    pub fn publish_interface(&self, pass: u64, record: Arc<TemplateInterfaceRecord>) {
        self.interfaces.publish(Discovery { pass, record }, &self.lane);
    }

    pub fn publish_implementation(&self, pass: u64, record: Arc<TemplateImplementationRecord>) {
        self.implementations
            .publish(Discovery { pass, record }, &self.lane);
    }

    pub fn publish_instantiation(&self, pass: u64, record: Arc<TemplateInstantiationRecord>) {
        self.instantiations
            .publish(Discovery { pass, record }, &self.lane);
    }

    pub fn lane(&self) -> &DispatchLane {
        &self.lane
    }

    /// Wait for pending callback deliveries.
    pub fn flush(&self) {
        self.lane.flush();
    }
}
