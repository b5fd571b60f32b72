//! Simulated compute service.
//!
//! Nodes live in per-group maps behind one lock. Every transition first puts
//! the node into a transitional power state; queries advance it, so callers
//! observe the same "request, then poll until settled" flow a real cloud
//! shows. Fault switches let tests make the backend unavailable, fail single
//! groups during enumeration, or pin nodes in a transitional state.

use std::collections::{BTreeMap, BTreeSet};

use compute_nodes_sdk::{
    BackendError, BackendNodeRecord, Enumeration, ImageRef, ProvisionRequest, QueryScope, SizeRef,
    Transition,
};
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{Dialect, InMemoryComputePluginConfig, SeedNode, SeedState};

/// Image aliases and the marketplace URNs they stand for.
const IMAGE_ALIASES: &[(&str, &str)] = &[
    ("linux", "Canonical:UbuntuServer:16.04.0-LTS:latest"),
    ("ubuntu", "Canonical:UbuntuServer:16.04.0-LTS:latest"),
    (
        "windows",
        "MicrosoftWindowsServer:WindowsServer:2016-Datacenter:latest",
    ),
];

/// First usable host in a subnet; lower addresses are reserved.
const FIRST_HOST: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Power {
    Starting,
    Running,
    Stopping,
    Stopped,
    Deallocating,
    Deallocated,
    Deleting,
}

impl Power {
    const fn is_settled(self) -> bool {
        matches!(self, Self::Running | Self::Stopped | Self::Deallocated)
    }

    /// Stable state reached when a transitional state settles. `None` means
    /// the node disappears.
    const fn settled(self) -> Option<Self> {
        match self {
            Self::Starting | Self::Running => Some(Self::Running),
            Self::Stopping | Self::Stopped => Some(Self::Stopped),
            Self::Deallocating | Self::Deallocated => Some(Self::Deallocated),
            Self::Deleting => None,
        }
    }

    const fn code(self, dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::AzureArm => match self {
                Self::Starting => "PowerState/starting",
                Self::Running => "PowerState/running",
                Self::Stopping => "PowerState/stopping",
                Self::Stopped => "PowerState/stopped",
                Self::Deallocating => "PowerState/deallocating",
                Self::Deallocated => "PowerState/deallocated",
                Self::Deleting => "ProvisioningState/deleting",
            },
            Dialect::Ec2 => match self {
                Self::Starting => "pending",
                Self::Running => "running",
                Self::Stopping | Self::Deallocating => "stopping",
                Self::Stopped | Self::Deallocated => "stopped",
                Self::Deleting => "shutting-down",
            },
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Deallocating => "deallocating",
            Self::Deallocated => "deallocated",
            Self::Deleting => "deleting",
        }
    }
}

#[derive(Debug, Clone)]
struct SimNode {
    cloud_id: String,
    name: String,
    group: String,
    region: String,
    size: String,
    image: String,
    power: Power,
    pending_polls: u32,
    public_ips: Vec<String>,
    private_ips: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    groups: BTreeMap<String, BTreeMap<String, SimNode>>,
    next_private_host: BTreeMap<String, u8>,
    next_public_host: u8,
    available: bool,
    failed_groups: BTreeSet<String>,
    held: BTreeSet<(String, String)>,
}

impl State {
    fn allocate_private(&mut self, group: &str) -> Result<String, BackendError> {
        let host = self
            .next_private_host
            .entry(group.to_owned())
            .or_insert(FIRST_HOST);
        let current = *host;
        *host = current
            .checked_add(1)
            .ok_or_else(|| BackendError::rejected(format!("subnet of {group} is exhausted")))?;
        Ok(format!("10.0.0.{current}"))
    }

    fn allocate_public(&mut self) -> Result<String, BackendError> {
        let current = self.next_public_host.max(FIRST_HOST);
        self.next_public_host = current
            .checked_add(1)
            .ok_or_else(|| BackendError::rejected("public address pool is exhausted"))?;
        Ok(format!("52.170.0.{current}"))
    }

    fn node_mut(&mut self, group: &str, name: &str) -> Result<&mut SimNode, BackendError> {
        self.groups
            .get_mut(group)
            .and_then(|nodes| nodes.get_mut(name))
            .ok_or_else(|| BackendError::not_found(name))
    }

    fn ensure_available(&self) -> Result<(), BackendError> {
        if self.available {
            Ok(())
        } else {
            Err(BackendError::unavailable("compute service unreachable"))
        }
    }

    /// Moves transitional nodes of `group` one poll closer to settling.
    fn advance_group(&mut self, group: &str) {
        let Some(nodes) = self.groups.get_mut(group) else {
            return;
        };
        let mut deleted = Vec::new();
        for node in nodes.values_mut() {
            if node.power.is_settled() || self.held.contains(&(node.group.clone(), node.name.clone()))
            {
                continue;
            }
            if node.pending_polls > 0 {
                node.pending_polls -= 1;
                continue;
            }
            match node.power.settled() {
                Some(power) => {
                    debug!(group, name = %node.name, from = node.power.label(), to = power.label(), "node settled");
                    node.power = power;
                }
                None => deleted.push(node.name.clone()),
            }
        }
        for name in deleted {
            debug!(group, %name, "node deleted");
            nodes.remove(&name);
        }
    }
}

/// In-memory compute backend.
#[derive(Debug)]
pub struct Service {
    config: InMemoryComputePluginConfig,
    state: Mutex<State>,
}

impl Service {
    /// Builds the backend and provisions the configured seed nodes.
    ///
    /// # Errors
    ///
    /// Fails when seed nodes repeat a name within a group, use an unknown
    /// size or image, or exhaust the address pool.
    pub fn new(config: InMemoryComputePluginConfig) -> Result<Self, BackendError> {
        let svc = Self {
            config,
            state: Mutex::new(State {
                available: true,
                ..State::default()
            }),
        };
        for seed in &svc.config.nodes {
            svc.seed(seed)?;
        }
        Ok(svc)
    }

    #[must_use]
    pub fn config(&self) -> &InMemoryComputePluginConfig {
        &self.config
    }

    fn seed(&self, seed: &SeedNode) -> Result<(), BackendError> {
        let image = Self::resolve_image(&seed.image)?;
        let size = self.resolve_size(&seed.size)?;
        let mut state = self.state.lock();
        let mut node = Self::allocate(
            &mut state,
            &seed.name,
            &seed.group,
            &seed.region,
            &image,
            &size,
            seed.public_ip,
        )?;
        node.power = match seed.state {
            SeedState::Running => Power::Running,
            SeedState::Stopped => Power::Stopped,
            SeedState::Deallocated => Power::Deallocated,
        };
        Self::insert(&mut state, node)
    }

    fn allocate(
        state: &mut State,
        name: &str,
        group: &str,
        region: &str,
        image: &ImageRef,
        size: &SizeRef,
        public_ip: bool,
    ) -> Result<SimNode, BackendError> {
        if state
            .groups
            .get(group)
            .is_some_and(|nodes| nodes.contains_key(name))
        {
            return Err(BackendError::name_conflict(name));
        }
        let private_ips = vec![state.allocate_private(group)?];
        let public_ips = if public_ip {
            vec![state.allocate_public()?]
        } else {
            Vec::new()
        };
        Ok(SimNode {
            cloud_id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            group: group.to_owned(),
            region: region.to_owned(),
            size: size.0.clone(),
            image: image.0.clone(),
            power: Power::Starting,
            pending_polls: 0,
            public_ips,
            private_ips,
        })
    }

    fn insert(state: &mut State, node: SimNode) -> Result<(), BackendError> {
        let nodes = state.groups.entry(node.group.clone()).or_default();
        if nodes.contains_key(&node.name) {
            return Err(BackendError::name_conflict(node.name));
        }
        nodes.insert(node.name.clone(), node);
        Ok(())
    }

    fn record(&self, node: &SimNode) -> BackendNodeRecord {
        BackendNodeRecord {
            cloud_id: node.cloud_id.clone(),
            name: node.name.clone(),
            group: node.group.clone(),
            region: node.region.clone(),
            size: node.size.clone(),
            status: node.power.code(self.config.dialect).to_owned(),
            public_ips: node.public_ips.clone(),
            private_ips: node.private_ips.clone(),
        }
    }

    fn begin(&self, node: &mut SimNode, power: Power) {
        debug!(group = %node.group, name = %node.name, from = node.power.label(), to = power.label(), "transition accepted");
        node.power = power;
        node.pending_polls = self.config.settle_after_polls;
    }

    /// Resolves an alias or a full `publisher:offer:sku:version` URN.
    ///
    /// # Errors
    ///
    /// `Rejected` for anything else.
    pub fn resolve_image(spec: &str) -> Result<ImageRef, BackendError> {
        if let Some((_, urn)) = IMAGE_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(spec))
        {
            return Ok(ImageRef((*urn).to_owned()));
        }
        let parts: Vec<_> = spec.split(':').collect();
        if parts.len() == 4 && parts.iter().all(|p| !p.trim().is_empty()) {
            return Ok(ImageRef(spec.to_owned()));
        }
        Err(BackendError::rejected(format!("unknown image '{spec}'")))
    }

    /// # Errors
    ///
    /// `Rejected` when the size is not offered.
    pub fn resolve_size(&self, spec: &str) -> Result<SizeRef, BackendError> {
        if self.config.sizes.iter().any(|s| s == spec) {
            Ok(SizeRef(spec.to_owned()))
        } else {
            Err(BackendError::rejected(format!("size '{spec}' is not offered")))
        }
    }

    /// # Errors
    ///
    /// `Unavailable`, `NameConflict`, or `Rejected` for an exhausted pool.
    pub fn provision(&self, request: &ProvisionRequest) -> Result<BackendNodeRecord, BackendError> {
        let public_ip = request
            .options
            .get("public_ip")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        let mut state = self.state.lock();
        state.ensure_available()?;
        let mut node = Self::allocate(
            &mut state,
            &request.name,
            &request.network.group,
            &request.network.region,
            &request.image,
            &request.size,
            public_ip,
        )?;
        node.pending_polls = self.config.settle_after_polls;
        let record = self.record(&node);
        info!(
            group = %node.group,
            name = %node.name,
            image = %node.image,
            network = %request.network.network,
            subnet = %request.network.subnet,
            "provisioned node"
        );
        Self::insert(&mut state, node)?;
        Ok(record)
    }

    /// # Errors
    ///
    /// `Unavailable` when the service is down, or when the single requested
    /// group is marked failing.
    pub fn query(&self, scope: &QueryScope) -> Result<Enumeration, BackendError> {
        let mut state = self.state.lock();
        state.ensure_available()?;

        let groups: Vec<String> = match scope {
            QueryScope::All => state.groups.keys().cloned().collect(),
            QueryScope::Group(group) => {
                if state.failed_groups.contains(group) {
                    return Err(BackendError::unavailable(format!(
                        "group {group} could not be listed"
                    )));
                }
                vec![group.clone()]
            }
        };

        let mut enumeration = Enumeration::default();
        for group in groups {
            if state.failed_groups.contains(&group) {
                enumeration.failed_groups.push(group);
                continue;
            }
            state.advance_group(&group);
            if let Some(nodes) = state.groups.get(&group) {
                enumeration
                    .records
                    .extend(nodes.values().map(|node| self.record(node)));
            }
        }
        Ok(enumeration)
    }

    /// # Errors
    ///
    /// `Unavailable`, `NotFound`, or `Rejected` when the node cannot make the
    /// transition from its current power state.
    pub fn transition(
        &self,
        group: &str,
        name: &str,
        transition: Transition,
    ) -> Result<BackendNodeRecord, BackendError> {
        let mut state = self.state.lock();
        state.ensure_available()?;
        let node = state.node_mut(group, name)?;

        let next = match (transition, node.power) {
            (Transition::Start | Transition::Resume, Power::Running | Power::Starting)
            | (
                Transition::Stop,
                Power::Stopped | Power::Stopping | Power::Deallocated | Power::Deallocating,
            )
            | (Transition::Suspend, Power::Deallocated | Power::Deallocating) => None,
            (Transition::Start | Transition::Resume, Power::Stopped | Power::Deallocated)
            | (Transition::Restart, Power::Running) => Some(Power::Starting),
            (Transition::Stop, Power::Running | Power::Starting) => Some(Power::Stopping),
            (Transition::Suspend, Power::Running | Power::Starting | Power::Stopped) => {
                Some(Power::Deallocating)
            }
            (_, power) => {
                return Err(BackendError::rejected(format!(
                    "cannot {transition} node {name} while {}",
                    power.label()
                )));
            }
        };

        if let Some(power) = next {
            self.begin(node, power);
        }
        Ok(self.record(node))
    }

    /// # Errors
    ///
    /// `Unavailable` or `NotFound`.
    pub fn deprovision(&self, group: &str, name: &str) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.ensure_available()?;
        let node = state.node_mut(group, name)?;
        if node.power != Power::Deleting {
            self.begin(node, Power::Deleting);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `Unavailable`, `NotFound`, or `NameConflict`.
    pub fn rename(
        &self,
        group: &str,
        name: &str,
        destination: &str,
    ) -> Result<BackendNodeRecord, BackendError> {
        let mut state = self.state.lock();
        state.ensure_available()?;
        let nodes = state
            .groups
            .get_mut(group)
            .ok_or_else(|| BackendError::not_found(name))?;
        if !nodes.contains_key(name) {
            return Err(BackendError::not_found(name));
        }
        if nodes.contains_key(destination) {
            return Err(BackendError::name_conflict(destination));
        }
        let mut node = nodes
            .remove(name)
            .ok_or_else(|| BackendError::not_found(name))?;
        node.name = destination.to_owned();
        let record = self.record(&node);
        nodes.insert(node.name.clone(), node);

        let key = (group.to_owned(), name.to_owned());
        if state.held.remove(&key) {
            state.held.insert((group.to_owned(), destination.to_owned()));
        }
        info!(group, from = name, to = destination, "renamed node");
        Ok(record)
    }

    /// Takes the whole service up or down.
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    /// Makes enumeration of `group` fail until [`heal_group`](Self::heal_group).
    pub fn fail_group(&self, group: &str) {
        self.state.lock().failed_groups.insert(group.to_owned());
    }

    pub fn heal_group(&self, group: &str) {
        self.state.lock().failed_groups.remove(group);
    }

    /// Keeps the node in whatever transitional state it reaches until
    /// released.
    pub fn hold_in_transition(&self, group: &str, name: &str) {
        self.state
            .lock()
            .held
            .insert((group.to_owned(), name.to_owned()));
    }

    pub fn release(&self, group: &str, name: &str) {
        self.state
            .lock()
            .held
            .remove(&(group.to_owned(), name.to_owned()));
    }

    /// Number of nodes across all groups, including ones being deleted.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.state.lock().groups.values().map(BTreeMap::len).sum()
    }
}
