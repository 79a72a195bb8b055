//! Capability checks consulted before every mutating operation.
//!
//! Identity itself is issued elsewhere; this crate only sees an [`Actor`]
//! handed in by the caller. For providers and patients `user_id` is the
//! provider id or patient id the actor is acting as.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::appointment::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Provider,
    Patient,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "provider" | "doctor" => Ok(Role::Provider),
            "patient" => Ok(Role::Patient),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Admin }
    }

    pub fn provider(provider_id: Uuid) -> Self {
        Self { user_id: provider_id, role: Role::Provider }
    }

    pub fn patient(patient_id: Uuid) -> Self {
        Self { user_id: patient_id, role: Role::Patient }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub trait AuthorizationGuard: Send + Sync {
    /// Create, publish, unpublish or delete schedules of `provider_id`, and
    /// close or reopen their slots.
    fn can_manage_schedule(&self, actor: &Actor, provider_id: Uuid) -> bool;

    /// Check in, complete or mark an appointment as a no-show.
    fn can_manage_appointment(&self, actor: &Actor, appointment: &Appointment) -> bool;

    fn can_cancel_appointment(&self, actor: &Actor, appointment: &Appointment) -> bool {
        self.can_manage_appointment(actor, appointment)
    }

    /// Reserve a slot on behalf of `patient_id`.
    fn can_book_for(&self, actor: &Actor, patient_id: Uuid) -> bool;
}

/// Admins may do anything, providers act on their own schedules and
/// appointments, patients book and cancel for themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleGuard;

impl AuthorizationGuard for RoleGuard {
    fn can_manage_schedule(&self, actor: &Actor, provider_id: Uuid) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Provider => actor.user_id == provider_id,
            Role::Patient => false,
        }
    }

    fn can_manage_appointment(&self, actor: &Actor, appointment: &Appointment) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Provider => actor.user_id == appointment.doctor_id,
            Role::Patient => false,
        }
    }

    fn can_cancel_appointment(&self, actor: &Actor, appointment: &Appointment) -> bool {
        match actor.role {
            Role::Patient => actor.user_id == appointment.patient_id,
            _ => self.can_manage_appointment(actor, appointment),
        }
    }

    fn can_book_for(&self, actor: &Actor, patient_id: Uuid) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Patient => actor.user_id == patient_id,
            Role::Provider => false,
        }
    }
}
