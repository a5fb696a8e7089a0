//! Payout and manual transfer requests
//!
//! Requests arrive as drafts with every field optional, so a missing field
//! is reported as a validation error rather than a JSON decoding failure.
//! Validation happens here, before anything reaches the backend.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::ActorKind;
use crate::wire;

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn ensure_positive(amount: Decimal) -> CoreResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::validation("valor must be greater than zero"));
    }
    Ok(amount)
}

/// Payout request body before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayoutDraft {
    #[serde(rename = "id_entregador", default, deserialize_with = "wire::id_option::deserialize")]
    pub courier_id: Option<String>,
    #[serde(rename = "valor", default)]
    pub amount: Option<Decimal>,
    #[serde(rename = "chave_pix", default)]
    pub pix_key: Option<String>,
    #[serde(rename = "observacao", default)]
    pub note: Option<String>,
}

impl PayoutDraft {
    /// Check required fields and the amount
    pub fn validate(self) -> CoreResult<ProcessPayout> {
        let courier_id = non_blank(self.courier_id);
        let pix_key = non_blank(self.pix_key);

        let (Some(courier_id), Some(amount), Some(pix_key)) = (courier_id, self.amount, pix_key) else {
            return Err(CoreError::validation(
                "id_entregador, valor and chave_pix are required",
            ));
        };

        Ok(ProcessPayout {
            courier_id,
            amount: ensure_positive(amount)?,
            pix_key,
            note: non_blank(self.note),
        })
    }
}

/// Validated request to create a pending payout exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPayout {
    pub courier_id: String,
    pub amount: Decimal,
    pub pix_key: String,
    pub note: Option<String>,
}

/// Confirmation request body before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmDraft {
    #[serde(rename = "id_movimentacao", default, deserialize_with = "wire::id_option::deserialize")]
    pub movement_id: Option<String>,
    #[serde(rename = "comprovante_url", default)]
    pub receipt_url: Option<String>,
}

impl ConfirmDraft {
    pub fn validate(self) -> CoreResult<ConfirmPayout> {
        let movement_id = non_blank(self.movement_id)
            .ok_or_else(|| CoreError::validation("id_movimentacao is required"))?;
        Ok(ConfirmPayout {
            movement_id,
            receipt_url: non_blank(self.receipt_url),
        })
    }
}

/// Validated request to mark a payout exit as paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmPayout {
    pub movement_id: String,
    pub receipt_url: Option<String>,
}

/// Process-then-confirm request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettleDraft {
    #[serde(flatten)]
    pub payout: PayoutDraft,
    #[serde(rename = "comprovante_url", default)]
    pub receipt_url: Option<String>,
}

impl SettleDraft {
    /// Validate the payout part; the receipt is optional
    pub fn validate(self) -> CoreResult<(ProcessPayout, Option<String>)> {
        Ok((self.payout.validate()?, non_blank(self.receipt_url)))
    }
}

/// Manual transfer to a restaurant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantTransfer {
    #[serde(rename = "restauranteId", deserialize_with = "wire::id::deserialize")]
    pub restaurant_id: String,
    #[serde(rename = "valor")]
    pub amount: Decimal,
    #[serde(rename = "comprovanteUrl", default)]
    pub receipt_url: Option<String>,
    #[serde(rename = "observacao", default)]
    pub note: Option<String>,
}

/// Manual transfer to any actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorTransfer {
    #[serde(rename = "id_usuario", deserialize_with = "wire::id::deserialize")]
    pub actor_id: String,
    #[serde(rename = "tipo_usuario")]
    pub actor_kind: ActorKind,
    #[serde(rename = "valor")]
    pub amount: Decimal,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(rename = "observacao", default)]
    pub note: Option<String>,
}

/// Manual transfer request, tagged by `variant`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant")]
pub enum TransferRequest {
    #[serde(rename = "restaurante")]
    Restaurant(RestaurantTransfer),
    #[serde(rename = "usuario")]
    Actor(ActorTransfer),
}

const VARIANT_TAG: &str = "variant";

fn has_value(object: &serde_json::Map<String, serde_json::Value>, key: &str) -> bool {
    match object.get(key) {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

impl TransferRequest {
    /// Decode a transfer body
    ///
    /// Tagged bodies decode directly. Untagged bodies are classified by
    /// shape: `restauranteId` means a restaurant transfer, `id_usuario` with
    /// `tipo_usuario` means an actor transfer. The result is validated.
    pub fn from_json(mut body: serde_json::Value) -> CoreResult<Self> {
        let Some(object) = body.as_object_mut() else {
            return Err(CoreError::InvalidFormat);
        };

        if !object.contains_key(VARIANT_TAG) {
            let legacy = if has_value(object, "restauranteId") {
                "restaurante"
            } else if has_value(object, "id_usuario") && has_value(object, "tipo_usuario") {
                "usuario"
            } else {
                return Err(CoreError::InvalidFormat);
            };
            object.insert(VARIANT_TAG.to_string(), serde_json::Value::from(legacy));
        }

        match object.get(VARIANT_TAG).and_then(|v| v.as_str()) {
            Some("restaurante") | Some("usuario") => {}
            _ => return Err(CoreError::InvalidFormat),
        }

        let request: TransferRequest = serde_json::from_value(body)
            .map_err(|e| CoreError::validation(format!("Invalid transfer request: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    /// Check the id and amount of either variant
    pub fn validate(&self) -> CoreResult<()> {
        if self.actor_id().trim().is_empty() {
            return Err(CoreError::validation("Transfer recipient id is required"));
        }
        ensure_positive(self.amount())?;
        Ok(())
    }

    pub fn actor_id(&self) -> &str {
        match self {
            TransferRequest::Restaurant(t) => &t.restaurant_id,
            TransferRequest::Actor(t) => &t.actor_id,
        }
    }

    pub fn actor_kind(&self) -> ActorKind {
        match self {
            TransferRequest::Restaurant(_) => ActorKind::Restaurant,
            TransferRequest::Actor(t) => t.actor_kind,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            TransferRequest::Restaurant(t) => t.amount,
            TransferRequest::Actor(t) => t.amount,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            TransferRequest::Restaurant(t) => t.note.as_deref(),
            TransferRequest::Actor(t) => t.note.as_deref(),
        }
    }
}
