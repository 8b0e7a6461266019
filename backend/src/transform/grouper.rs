//! Group mapped handlers and waste lines by manifest.
//!
//! # Architecture
//!
//! ```text
//! Handler rows (flat)                     Grouped by manifestId
//! ┌───────────────────────────────┐      ┌──────────────────────────────┐
//! │ 1  Generator           GEN001 │      │ manifestId 1                 │
//! │ 1  Transporter (2)     TRN002 │  →   │ generator: GEN001            │
//! │ 1  Transporter (1)     TRN001 │      │ transporters: [TRN001,TRN002]│
//! │ 1  DesignatedFacility  TSD001 │      │ designatedFacility: TSD001   │
//! └───────────────────────────────┘      └──────────────────────────────┘
//! ```
//!
//! Transporters are ordered by their `order` column.

use std::collections::BTreeMap;

use super::handlers::MappedHandler;
use crate::models::{HandlerType, WasteLineRecord};

/// All handlers of one manifest, by role.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerGroup {
    pub manifest_id: i64,
    pub generator: MappedHandler,
    pub transporters: Vec<MappedHandler>,
    pub designated_facility: MappedHandler,
    pub broker: Option<MappedHandler>,
}

impl HandlerGroup {
    /// Every handler of the group: generator, transporters, facility, broker.
    pub fn handlers(&self) -> impl Iterator<Item = &MappedHandler> {
        std::iter::once(&self.generator)
            .chain(self.transporters.iter())
            .chain(std::iter::once(&self.designated_facility))
            .chain(self.broker.iter())
    }
}

/// Group handlers by manifest, ascending by manifestId.
///
/// A manifest missing its generator or facility yields no group; role
/// validation reports that before grouping runs. Extra single-role
/// handlers past the first are ignored for the same reason.
pub fn group_handlers(handlers: Vec<MappedHandler>) -> Vec<HandlerGroup> {
    let mut builders: BTreeMap<i64, GroupBuilder> = BTreeMap::new();

    for handler in handlers {
        let id = handler.manifest_id;
        builders
            .entry(id)
            .or_insert_with(|| GroupBuilder::new(id))
            .add(handler);
    }

    builders.into_values().filter_map(GroupBuilder::build).collect()
}

/// Waste lines by manifestId, each list in sheet order.
pub fn group_wastes(wastes: Vec<WasteLineRecord>) -> BTreeMap<i64, Vec<WasteLineRecord>> {
    let mut grouped: BTreeMap<i64, Vec<WasteLineRecord>> = BTreeMap::new();
    for waste in wastes {
        grouped.entry(waste.manifest_id).or_default().push(waste);
    }
    grouped
}

/// Accumulates one manifest's handlers while grouping.
struct GroupBuilder {
    manifest_id: i64,
    generator: Option<MappedHandler>,
    transporters: Vec<MappedHandler>,
    designated_facility: Option<MappedHandler>,
    broker: Option<MappedHandler>,
}

impl GroupBuilder {
    fn new(manifest_id: i64) -> Self {
        Self {
            manifest_id,
            generator: None,
            transporters: Vec::new(),
            designated_facility: None,
            broker: None,
        }
    }

    fn add(&mut self, handler: MappedHandler) {
        match handler.role {
            HandlerType::Generator => {
                self.generator.get_or_insert(handler);
            }
            HandlerType::Transporter => self.transporters.push(handler),
            HandlerType::DesignatedFacility => {
                self.designated_facility.get_or_insert(handler);
            }
            HandlerType::Broker => {
                self.broker.get_or_insert(handler);
            }
        }
    }

    fn build(mut self) -> Option<HandlerGroup> {
        // stable: equal orders keep sheet order
        self.transporters
            .sort_by_key(|t| t.order().unwrap_or(i64::MAX));

        Some(HandlerGroup {
            manifest_id: self.manifest_id,
            generator: self.generator?,
            transporters: self.transporters,
            designated_facility: self.designated_facility?,
            broker: self.broker,
        })
    }
}
