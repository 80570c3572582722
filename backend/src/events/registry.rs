//! Event registry
//!
//! Holds every registered event keyed by a monotonically increasing id.
//!
//! Accumulator rules:
//! - coverage, premiums and insurer capital only move while the event is open
//! - the premium escrow may be released after trigger so collected premiums
//!   are never stranded
//! - payout bookkeeping is the only mutation allowed once triggered

use crate::core::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::math::{self, Amount, Bps, MathError, BPS};
use crate::core::time::Timestamp;
use crate::events::EventError;
use crate::models::event::{Event, EventId, RiskParameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRegistry {
    events: BTreeMap<EventId, Event>,
    next_id: EventId,
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self {
            events: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from checkpointed events; ids continue after the highest one
    /// Rebuild from restored events; ids continue after the highest one
    pub fn from_events(events: Vec<Event>) -> Result<Self, MathError> {
        let highest = events.iter().map(|e| e.id).max().unwrap_or(0);
        let next_id = highest.checked_add(1).ok_or(MathError::Overflow)?;
        Ok(Self {
            events: events.into_iter().map(|e| (e.id, e)).collect(),
            next_id,
        })
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Result<&Event, EventError> {
        self.events.get(&id).ok_or(EventError::UnknownEvent(id))
    }

    /// Event that exists and still accepts capital, policies and premiums
    pub fn get_open(&self, id: EventId) -> Result<&Event, EventError> {
        let event = self.get(id)?;
        if !event.is_open() {
            return Err(EventError::EventNotActive(id));
        }
        Ok(event)
    }

    /// Sum of expected loss ratios over every registered event
    pub fn expected_loss_ratio_sum(&self) -> Result<Amount, PoolError> {
        Ok(math::sum(
            self.events
                .values()
                .map(|e| Amount::from(e.risk.expected_loss_ratio_bps)),
        )?)
    }

    /// `sum(coverage * elr)` over events that have not been triggered
    pub fn total_expected_loss(&self) -> Result<Amount, PoolError> {
        let mut total: Amount = 0;
        for event in self.events.values().filter(|e| !e.is_triggered) {
            let loss = math::apply_bps(event.total_coverage, event.risk.expected_loss_ratio_bps)?;
            total = math::add(total, loss)?;
        }
        Ok(total)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn register_event(
        &mut self,
        name: &str,
        description: &str,
        trigger_threshold_bps: Bps,
        base_premium_bps: Bps,
        config: &PoolConfig,
        now: Timestamp,
    ) -> Result<EventId, EventError> {
        if name.trim().is_empty() {
            return Err(EventError::EmptyName);
        }
        if trigger_threshold_bps > BPS {
            return Err(EventError::InvalidRiskParameters(format!(
                "trigger threshold {} exceeds {}",
                trigger_threshold_bps, BPS
            )));
        }
        if base_premium_bps == 0 || base_premium_bps > BPS {
            return Err(EventError::InvalidRiskParameters(format!(
                "base premium must be in 1..={}, got {}",
                BPS, base_premium_bps
            )));
        }
        let max_premium_bps = base_premium_bps
            .checked_mul(config.max_premium_multiplier)
            .ok_or_else(|| EventError::InvalidRiskParameters("max premium overflows".to_string()))?;

        let risk = RiskParameters {
            expected_loss_ratio_bps: config.default_expected_loss_ratio_bps,
            total_loss_ratio_bps: config.default_total_loss_ratio_bps,
            max_premium_bps,
        };
        validate_risk(&risk)?;

        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(MathError::Overflow)?;
        self.events.insert(
            id,
            Event {
                id,
                name: name.to_string(),
                description: description.to_string(),
                trigger_threshold_bps,
                is_triggered: false,
                trigger_time: None,
                total_coverage: 0,
                total_premiums: 0,
                base_premium_bps,
                is_active: true,
                total_insurer_capital: 0,
                accumulated_premiums: 0,
                last_distribution_time: None,
                total_payouts: 0,
                risk,
                created_at: now,
            },
        );
        Ok(id)
    }

    /// Mark the event as having happened (terminal)
    pub fn trigger(&mut self, id: EventId, now: Timestamp) -> Result<(), EventError> {
        let event = self.get_mut(id)?;
        if event.is_triggered {
            return Err(EventError::AlreadyTriggered(id));
        }
        if !event.is_active {
            return Err(EventError::EventNotActive(id));
        }
        event.is_triggered = true;
        event.trigger_time = Some(now);
        event.is_active = false;
        Ok(())
    }

    pub fn set_risk_parameters(&mut self, id: EventId, risk: RiskParameters) -> Result<(), EventError> {
        validate_risk(&risk)?;
        self.open_mut(id)?.risk = risk;
        Ok(())
    }

    // ========================================================================
    // Accumulators
    // ========================================================================

    pub fn add_coverage(&mut self, id: EventId, amount: Amount) -> Result<Amount, PoolError> {
        let event = self.open_mut(id)?;
        event.total_coverage = math::add(event.total_coverage, amount)?;
        Ok(event.total_coverage)
    }

    /// Add collected premiums to the escrow and the lifetime total
    pub fn accumulate_premiums(&mut self, id: EventId, amount: Amount) -> Result<Amount, PoolError> {
        let event = self.open_mut(id)?;
        let accumulated = math::add(event.accumulated_premiums, amount)?;
        let total = math::add(event.total_premiums, amount)?;
        event.accumulated_premiums = accumulated;
        event.total_premiums = total;
        Ok(accumulated)
    }

    /// Empty the premium escrow, returning what it held
    pub fn clear_accumulated_premiums(&mut self, id: EventId) -> Result<Amount, EventError> {
        let event = self.get_mut(id)?;
        Ok(std::mem::take(&mut event.accumulated_premiums))
    }

    pub fn mark_distributed(&mut self, id: EventId, now: Timestamp) -> Result<(), EventError> {
        self.get_mut(id)?.last_distribution_time = Some(now);
        Ok(())
    }

    /// Overwrite the event's insurer capital with the pool's current total
    pub fn set_insurer_capital(&mut self, id: EventId, capital: Amount) -> Result<(), EventError> {
        self.get_mut(id)?.total_insurer_capital = capital;
        Ok(())
    }

    pub fn record_payouts(&mut self, id: EventId, payouts: Amount) -> Result<Amount, PoolError> {
        let event = self.get_mut(id)?;
        if !event.is_triggered {
            return Err(EventError::NotTriggered(id).into());
        }
        event.total_payouts = math::add(event.total_payouts, payouts)?;
        Ok(event.total_payouts)
    }

    fn get_mut(&mut self, id: EventId) -> Result<&mut Event, EventError> {
        self.events.get_mut(&id).ok_or(EventError::UnknownEvent(id))
    }

    fn open_mut(&mut self, id: EventId) -> Result<&mut Event, EventError> {
        let event = self.get_mut(id)?;
        if !event.is_open() {
            return Err(EventError::EventNotActive(id));
        }
        Ok(event)
    }
}

fn validate_risk(risk: &RiskParameters) -> Result<(), EventError> {
    if risk.expected_loss_ratio_bps == 0 || risk.expected_loss_ratio_bps > BPS {
        return Err(EventError::InvalidRiskParameters(format!(
            "expected loss ratio must be in 1..={}, got {}",
            BPS, risk.expected_loss_ratio_bps
        )));
    }
    if risk.total_loss_ratio_bps < risk.expected_loss_ratio_bps {
        return Err(EventError::InvalidRiskParameters(format!(
            "total loss ratio {} below expected loss ratio {}",
            risk.total_loss_ratio_bps, risk.expected_loss_ratio_bps
        )));
    }
    if risk.max_premium_bps == 0 {
        return Err(EventError::InvalidRiskParameters(
            "max premium must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_event() -> (EventRegistry, EventId) {
        let mut registry = EventRegistry::new();
        let id = registry
            .register_event("BTC -20%", "drawdown", 2_000, 500, &PoolConfig::default(), 100)
            .unwrap();
        (registry, id)
    }

    #[test]
    fn test_register_assigns_defaults() {
        let (registry, id) = registry_with_event();
        assert_eq!(id, 1);
        let event = registry.event(id).unwrap();
        assert_eq!(event.risk.expected_loss_ratio_bps, 500);
        assert_eq!(event.risk.total_loss_ratio_bps, 15_000);
        assert_eq!(event.risk.max_premium_bps, 5_000);
        assert!(event.is_open());
        assert_eq!(event.created_at, 100);
    }

    #[test]
    fn test_ids_increase() {
        let (mut registry, _) = registry_with_event();
        let second = registry
            .register_event("ETH -30%", "", 3_000, 300, &PoolConfig::default(), 0)
            .unwrap();
        assert_eq!(second, 2);
        assert_eq!(registry.expected_loss_ratio_sum().unwrap(), 1_000);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = EventRegistry::new();
        assert_eq!(
            registry.register_event("  ", "", 0, 500, &PoolConfig::default(), 0),
            Err(EventError::EmptyName)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_trigger_once() {
        let (mut registry, id) = registry_with_event();
        registry.trigger(id, 500).unwrap();
        assert_eq!(registry.trigger(id, 600), Err(EventError::AlreadyTriggered(id)));
        let event = registry.event(id).unwrap();
        assert_eq!(event.trigger_time, Some(500));
        assert!(!event.is_active);
    }

    #[test]
    fn test_accumulators_closed_after_trigger() {
        let (mut registry, id) = registry_with_event();
        registry.accumulate_premiums(id, 40).unwrap();
        registry.trigger(id, 1).unwrap();

        assert_eq!(
            registry.add_coverage(id, 10),
            Err(PoolError::Event(EventError::EventNotActive(id)))
        );
        assert_eq!(registry.clear_accumulated_premiums(id), Ok(40));
        assert_eq!(registry.event(id).unwrap().total_premiums, 40);
    }

    #[test]
    fn test_expected_loss_skips_triggered() {
        let (mut registry, id) = registry_with_event();
        registry.add_coverage(id, 10_000).unwrap();
        assert_eq!(registry.total_expected_loss().unwrap(), 500);
        registry.trigger(id, 1).unwrap();
        assert_eq!(registry.total_expected_loss().unwrap(), 0);
    }

    #[test]
    fn test_from_events_continues_ids() {
        let (registry, _) = registry_with_event();
        let events: Vec<Event> = registry.events().cloned().collect();
        let mut restored = EventRegistry::from_events(events).unwrap();
        let id = restored
            .register_event("Next", "", 0, 100, &PoolConfig::default(), 0)
            .unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn test_from_events_rejects_exhausted_ids() {
        let (registry, id) = registry_with_event();
        let mut event = registry.get(id).unwrap().clone();
        event.id = u64::MAX;
        assert_eq!(
            EventRegistry::from_events(vec![event.clone()]).err(),
            Some(MathError::Overflow)
        );

        // The last id restores, but no further event can be registered
        event.id = u64::MAX - 1;
        let mut restored = EventRegistry::from_events(vec![event]).unwrap();
        assert_eq!(
            restored.register_event("Next", "", 0, 100, &PoolConfig::default(), 0),
            Err(EventError::Math(MathError::Overflow))
        );
        assert_eq!(restored.len(), 1);
    }
}
