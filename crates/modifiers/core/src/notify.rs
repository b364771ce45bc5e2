//! Change notifications and their delivery to consuming components.
//!
//! The manager never calls consumers directly. Every mutation queues a
//! [`Notice`]; the host drains them through a [`NotificationRouter`] once the
//! mutation is done. Listeners receive `&mut ModifiersManager`, so they may
//! re-read values or register further modifiers while handling a notice; the
//! notices that produces are delivered in the next round.
//!
//! Notices are coalesced by `(target, component)` in first-seen order before
//! delivery, so a batch registration touching five `Attack/...` paths on one
//! entity reaches the `Attack` listener once with five paths.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::engine::ModifiersManager;
use crate::env::{Env, IdentityOracle, OwnershipOracle};
use crate::error::{EngineError, ErrorSeverity};
use crate::types::{EntityId, PlayerId, PropertyPath};

/// Name of a consuming component: the leading segment of a property path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(Arc<str>);

impl ComponentId {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Component owning `path`.
    pub fn of(path: &PropertyPath, separator: char) -> Self {
        Self::new(path.component(separator))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A pending change queued by the manager.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// An entity-local modifier on `property` changed.
    Entity {
        entity: EntityId,
        property: PropertyPath,
    },
    /// A player-wide modifier on `property` changed. `tracked` holds the
    /// entities that had resolved `property` through the player's scope; it
    /// stands in for the owned-entity list when no ownership oracle is present.
    Player {
        player: PlayerId,
        property: PropertyPath,
        tracked: Vec<EntityId>,
    },
    /// `entity` changed owner and these paths of `component` now resolve
    /// differently.
    Ownership {
        entity: EntityId,
        component: ComponentId,
        properties: Vec<PropertyPath>,
    },
}

/// Resolved values of `properties` may have changed for `entities`.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueModification {
    pub entities: Vec<EntityId>,
    pub component: ComponentId,
    pub properties: Vec<PropertyPath>,
}

/// Hypothetical (template) values of `properties` may have changed for `player`.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateModification {
    pub player: PlayerId,
    pub component: ComponentId,
    pub properties: Vec<PropertyPath>,
}

/// A component that keeps derived state on top of resolved values.
pub trait ValueListener {
    fn on_value_modification(&mut self, manager: &mut ModifiersManager, event: &ValueModification);
}

/// An observer of player-wide (template) changes, e.g. a UI or an AI.
pub trait TemplateListener {
    fn on_template_modification(&mut self, event: &TemplateModification);
}

/// Errors raised while delivering notices.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("no listener registered for component `{component}` (path `{property}`)")]
    UnknownComponent {
        component: ComponentId,
        property: PropertyPath,
    },

    #[error("notifications did not settle after {rounds} rounds")]
    DispatchLimit { rounds: u32 },
}

impl EngineError for NotifyError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownComponent { .. } => ErrorSeverity::Fatal,
            Self::DispatchLimit { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownComponent { .. } => "NOTIFY_UNKNOWN_COMPONENT",
            Self::DispatchLimit { .. } => "NOTIFY_DISPATCH_LIMIT",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Target {
    Entity(EntityId),
    Player(PlayerId),
}

#[derive(Debug)]
struct Batch {
    target: Target,
    component: ComponentId,
    properties: Vec<PropertyPath>,
    tracked: Vec<EntityId>,
}

impl Batch {
    fn push(&mut self, property: PropertyPath) {
        if !self.properties.contains(&property) {
            self.properties.push(property);
        }
    }
}

/// Groups notices by `(target, component)`, keeping first-seen order.
fn coalesce(notices: Vec<Notice>, separator: char) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();
    let mut merge = |target: Target, component: ComponentId, properties: Vec<PropertyPath>, tracked: Vec<EntityId>| {
        match batches
            .iter_mut()
            .find(|batch| batch.target == target && batch.component == component)
        {
            Some(batch) => {
                properties.into_iter().for_each(|p| batch.push(p));
                for entity in tracked {
                    if !batch.tracked.contains(&entity) {
                        batch.tracked.push(entity);
                    }
                }
            }
            None => {
                let mut batch = Batch {
                    target,
                    component,
                    properties: Vec::new(),
                    tracked,
                };
                properties.into_iter().for_each(|p| batch.push(p));
                batches.push(batch);
            }
        }
    };

    for notice in notices {
        match notice {
            Notice::Entity { entity, property } => {
                let component = ComponentId::of(&property, separator);
                merge(Target::Entity(entity), component, vec![property], Vec::new());
            }
            Notice::Player {
                player,
                property,
                tracked,
            } => {
                let component = ComponentId::of(&property, separator);
                merge(Target::Player(player), component, vec![property], tracked);
            }
            Notice::Ownership {
                entity,
                component,
                properties,
            } => merge(Target::Entity(entity), component, properties, Vec::new()),
        }
    }
    batches
}

/// Listener registry keyed by component.
#[derive(Default)]
pub struct NotificationRouter {
    listeners: BTreeMap<ComponentId, Vec<Box<dyn ValueListener>>>,
    template_listeners: Vec<Box<dyn TemplateListener>>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener for `component`. Several listeners per component are
    /// called in registration order.
    pub fn register(&mut self, component: impl Into<ComponentId>, listener: Box<dyn ValueListener>) {
        self.listeners
            .entry(component.into())
            .or_default()
            .push(listener);
    }

    pub fn register_template_listener(&mut self, listener: Box<dyn TemplateListener>) {
        self.template_listeners.push(listener);
    }

    pub fn is_registered(&self, component: &ComponentId) -> bool {
        self.listeners.contains_key(component)
    }

    /// Drains the manager's notices and delivers them until none are left.
    ///
    /// Player-wide notices expand to the player's entities through the
    /// ownership oracle of `env`, falling back to the entities that had
    /// resolved the property through the player's scope. Returns the number of
    /// value events delivered.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::UnknownComponent`] if a notice names a component with
    ///   no listener. Nothing from that round is delivered.
    /// - [`NotifyError::DispatchLimit`] if listeners keep producing notices
    ///   for more than `max_dispatch_rounds` rounds.
    pub fn dispatch<I, O>(
        &mut self,
        manager: &mut ModifiersManager,
        env: &Env<'_, I, O>,
    ) -> Result<usize, NotifyError>
    where
        I: IdentityOracle + ?Sized,
        O: OwnershipOracle + ?Sized,
    {
        let max_rounds = manager.config().max_dispatch_rounds;
        let separator = manager.config().component_separator;
        let mut delivered = 0;

        for round in 0.. {
            let notices = manager.take_notices();
            if notices.is_empty() {
                return Ok(delivered);
            }
            if round >= max_rounds {
                error!(
                    target: "modifiers::engine",
                    rounds = max_rounds,
                    pending = notices.len(),
                    "Notifications did not settle"
                );
                return Err(NotifyError::DispatchLimit { rounds: max_rounds });
            }

            let batches = coalesce(notices, separator);
            if let Some(batch) = batches
                .iter()
                .find(|batch| !self.listeners.contains_key(&batch.component))
            {
                let property = batch.properties.first().cloned().unwrap_or_else(|| PropertyPath::from(""));
                error!(
                    target: "modifiers::engine",
                    component = %batch.component,
                    property = %property,
                    "Notification for unregistered component"
                );
                return Err(NotifyError::UnknownComponent {
                    component: batch.component.clone(),
                    property,
                });
            }

            debug!(
                target: "modifiers::engine",
                round,
                batches = batches.len(),
                "Dispatching modifier notices"
            );

            for batch in batches {
                let event = match batch.target {
                    Target::Entity(entity) => ValueModification {
                        entities: vec![entity],
                        component: batch.component,
                        properties: batch.properties,
                    },
                    Target::Player(player) => {
                        let template = TemplateModification {
                            player,
                            component: batch.component.clone(),
                            properties: batch.properties.clone(),
                        };
                        for listener in &mut self.template_listeners {
                            listener.on_template_modification(&template);
                        }
                        let entities = env.entities_of(player).unwrap_or(batch.tracked);
                        ValueModification {
                            entities,
                            component: batch.component,
                            properties: batch.properties,
                        }
                    }
                };

                if let Some(listeners) = self.listeners.get_mut(&event.component) {
                    for listener in listeners.iter_mut() {
                        listener.on_value_modification(manager, &event);
                        delivered += 1;
                    }
                }
            }
        }
        Ok(delivered)
    }
}
