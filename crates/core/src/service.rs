//! The despawn service: owns the rule table, registry and scanner, and wires
//! them to the injected host collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use despawnrate_common::{EntityId, TaskId};
use parking_lot::{Mutex, RwLock};

use crate::config::{ConfigError, ConfigSource, DespawnConfig, Settings};
use crate::host::{Clock, ItemHost, ItemView, TaskScheduler};
use crate::lifecycle::{LifecycleEvent, Picker, merge_deadline};
use crate::registry::DeadlineRegistry;
use crate::rules::RuleSet;
use crate::status::StatusReport;
use crate::sweep::{Scanner, ScannerState, SweepReport, sweep_pass};
use crate::tracking::{Decision, RejectReason, decide};

/// Ticks between an item being announced and it being evaluated. The host may
/// announce an item before it is fully valid.
pub const TRACK_DELAY_TICKS: u64 = 1;

/// Lock order: `gate`, then the scanner, then the host scheduler. `deferred`
/// is never held while taking `gate`.
pub struct DespawnService {
    host: Arc<dyn ItemHost>,
    scheduler: Arc<dyn TaskScheduler>,
    clock: Arc<dyn Clock>,
    config: Arc<dyn ConfigSource>,
    rules: RwLock<Arc<RuleSet>>,
    settings: RwLock<Settings>,
    registry: DeadlineRegistry,
    scanner: Scanner,
    debug: AtomicBool,
    enabled: AtomicBool,
    /// Shared by inserts, exclusive for enable/disable/reload.
    gate: RwLock<()>,
    /// One-shot tasks not yet run, cancelled on disable.
    deferred: Mutex<HashMap<u64, TaskId>>,
    next_deferred: AtomicU64,
    this: Weak<DespawnService>,
}

impl DespawnService {
    pub fn new(
        host: Arc<dyn ItemHost>,
        scheduler: Arc<dyn TaskScheduler>,
        clock: Arc<dyn Clock>,
        config: Arc<dyn ConfigSource>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            host,
            scheduler,
            clock,
            config,
            rules: RwLock::new(Arc::new(RuleSet::empty())),
            settings: RwLock::new(Settings::default()),
            registry: DeadlineRegistry::new(),
            scanner: Scanner::new(),
            debug: AtomicBool::new(false),
            enabled: AtomicBool::new(false),
            gate: RwLock::new(()),
            deferred: Mutex::new(HashMap::new()),
            next_deferred: AtomicU64::new(0),
            this: this.clone(),
        })
    }

    /// Load rules and schedule tracking of items that already exist.
    ///
    /// A config that cannot be read leaves the service enabled with no rules.
    pub fn enable(&self) {
        let config = self.config.load().unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to load config; no items will be tracked");
            DespawnConfig::default()
        });
        {
            let _gate = self.gate.write();
            self.apply_config(&config);
            self.enabled.store(true, Ordering::SeqCst);
        }

        let rules = self.rules();
        if rules.is_empty() {
            tracing::info!("no items configured");
        } else {
            for (kind, seconds) in rules.iter() {
                tracing::info!(%kind, seconds, "configured");
            }
        }

        self.defer(|service| {
            let tracked = service.track_all_live();
            tracing::debug!(tracked, "tracked pre-existing items");
        });
    }

    /// Cancel the scanner and any deferred tracking, and forget every tracked
    /// item. Nothing is tracked again until the next `enable`.
    pub fn disable(&self) {
        let pending: Vec<TaskId> = {
            let _gate = self.gate.write();
            self.enabled.store(false, Ordering::SeqCst);
            self.scanner.force_stop(|id| self.scheduler.cancel(id));
            self.registry.clear();
            self.deferred.lock().drain().map(|(_, id)| id).collect()
        };
        for id in &pending {
            self.scheduler.cancel(*id);
        }
        tracing::info!(cancelled = pending.len(), "disabled");
    }

    /// Run `task` one tick from now unless the service is disabled first.
    fn defer(&self, task: impl FnOnce(&DespawnService) + Send + 'static) {
        let key = self.next_deferred.fetch_add(1, Ordering::Relaxed);
        let this = self.this.clone();
        // held across scheduling so the task cannot deregister before it is
        // registered
        let mut deferred = self.deferred.lock();
        let id = self.scheduler.schedule_once(
            TRACK_DELAY_TICKS,
            Box::new(move || {
                if let Some(service) = this.upgrade() {
                    service.deferred.lock().remove(&key);
                    task(&service);
                }
            }),
        );
        deferred.insert(key, id);
    }

    /// Re-read config, rebuild rules, and re-evaluate every live item from
    /// scratch. On error the previous rules and entries are kept. Does
    /// nothing while disabled.
    pub fn reload(&self) -> Result<usize, ConfigError> {
        let config = self.config.load()?;
        {
            let _gate = self.gate.write();
            if !self.is_enabled() {
                tracing::debug!("reload ignored while disabled");
                return Ok(0);
            }
            self.apply_config(&config);
            // restarted by the first re-track, picking up a changed interval
            self.scanner.force_stop(|id| self.scheduler.cancel(id));
            self.registry.clear();
        }
        let tracked = self.track_all_live();
        tracing::info!(rules = self.rules().len(), tracked, "config reloaded");
        Ok(tracked)
    }

    fn apply_config(&self, config: &DespawnConfig) {
        let rules = RuleSet::load(config, self.host.as_ref());
        *self.rules.write() = Arc::new(rules);
        *self.settings.write() = config.settings.clone();
        self.debug.store(config.settings.debug, Ordering::SeqCst);
    }

    /// Route a host notification. Ignored while disabled.
    pub fn on_event(&self, event: LifecycleEvent) {
        if !self.is_enabled() {
            return;
        }
        match event {
            LifecycleEvent::Spawned { item } | LifecycleEvent::Dropped { item, .. } => {
                self.track_later(item);
            }
            LifecycleEvent::PickedUp {
                item,
                picker: Picker::Actor(_),
            } => {
                self.registry.remove(item);
                if self.is_debug() {
                    tracing::debug!(%item, "pickup removed tracking");
                }
            }
            LifecycleEvent::PickedUp {
                picker: Picker::Other,
                ..
            } => {}
            LifecycleEvent::Merged { source, target } => {
                self.merge(source, target);
            }
        }
    }

    fn track_later(&self, item: EntityId) {
        self.defer(move |service| {
            service.track_by_id(item);
        });
    }

    /// Apply the merge policy and write the result under `target`. Returns
    /// the new deadline, or `None` while disabled.
    pub fn merge(&self, source: EntityId, target: EntityId) -> Option<u64> {
        let _gate = self.gate.read();
        if !self.is_enabled() {
            return None;
        }
        let source_deadline = self.registry.remove(source);
        let target_deadline = self.registry.get(target);
        let fallback = self.settings.read().merge_fallback_millis();
        let deadline = merge_deadline(
            source_deadline,
            target_deadline,
            self.clock.now_millis(),
            fallback,
        );
        self.registry.put(target, deadline);
        if self.is_debug() {
            tracing::debug!(%source, %target, deadline, "merge");
        }
        self.ensure_scanner();
        Some(deadline)
    }

    /// Resolve `id` through the host and evaluate it.
    pub fn track_by_id(&self, id: EntityId) -> bool {
        match self.host.lookup(id) {
            Some(item) => self.maybe_track(&item, self.clock.now_millis()),
            None => {
                if self.is_debug() {
                    tracing::debug!(%id, "item gone before it could be tracked");
                }
                false
            }
        }
    }

    /// Track `item` if the service is enabled, the item is valid and its kind
    /// has a rule. No side effects on rejection.
    pub fn maybe_track(&self, item: &ItemView, now: u64) -> bool {
        let _gate = self.gate.read();
        if !self.is_enabled() {
            return false;
        }
        let rules = self.rules();
        match decide(item, &rules, now) {
            Decision::Track { deadline, seconds } => {
                self.registry.put(item.id, deadline);
                if self.is_debug() {
                    tracing::info!(id = %item.id, kind = %item.kind, seconds, "tracking");
                }
                self.ensure_scanner();
                true
            }
            Decision::Reject(reason) => {
                if self.is_debug() {
                    match reason {
                        RejectReason::Invalid => {
                            tracing::debug!(id = %item.id, "skipped invalid item");
                        }
                        RejectReason::Unconfigured(kind) => {
                            tracing::trace!(%kind, "not configured, skipping");
                        }
                    }
                }
                false
            }
        }
    }

    /// Evaluate every live item against the current rules.
    pub fn track_all_live(&self) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let now = self.clock.now_millis();
        self.host
            .live_items()
            .iter()
            .filter(|item| self.maybe_track(item, now))
            .count()
    }

    fn ensure_scanner(&self) {
        let period = self.settings.read().sweep_interval_ticks;
        let started = self.scanner.ensure_running(&self.registry, || {
            let this = self.this.clone();
            self.scheduler.schedule_repeating(
                period,
                period,
                Box::new(move || {
                    if let Some(service) = this.upgrade() {
                        service.sweep();
                    }
                }),
            )
        });
        if started && self.is_debug() {
            tracing::debug!(period_ticks = period, "scanner started");
        }
    }

    /// One scanner tick: sweep, then go idle if nothing is left.
    pub fn sweep(&self) -> SweepReport {
        let report = sweep_pass(
            &self.registry,
            self.host.as_ref(),
            self.clock.now_millis(),
            self.is_debug(),
        );
        if self
            .scanner
            .stop_if_idle(&self.registry, |id| self.scheduler.cancel(id))
            && self.is_debug()
        {
            tracing::debug!("scanner cancelled");
        }
        report
    }

    pub fn toggle_debug(&self) -> bool {
        !self.debug.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::SeqCst);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn rules(&self) -> Arc<RuleSet> {
        Arc::clone(&self.rules.read())
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn registry(&self) -> &DeadlineRegistry {
        &self.registry
    }

    pub fn scanner_state(&self) -> ScannerState {
        self.scanner.state()
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            enabled: self.is_enabled(),
            debug: self.is_debug(),
            rules: self.rules().len(),
            tracked: self.registry.len(),
            scanner_active: self.scanner.is_active(),
            next_deadline: self.registry.next_deadline(),
        }
    }

    /// Line shown to operators joining while debug mode is on.
    pub fn join_notice(&self, operator: bool) -> Option<String> {
        (operator && self.is_debug()).then(|| {
            format!(
                "[DespawnRate] debug={} tracked={}",
                self.is_debug(),
                self.registry.len()
            )
        })
    }
}
