//! Receipt: a signed, immutable record of one workflow step.
//!
//! Receipts come in four kinds forming a linear workflow over an
//! experimental artifact: capture (root), then eval, label, and promote,
//! each linked to a parent receipt by rid. Once sealed, a receipt is never
//! edited; corrections are new receipts.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::canonical::{canonical_bytes, SIG_FIELD};
use crate::crypto::{PublicKey, SignatureBytes};
use crate::error::{CoreError, Result};
use crate::signer::Signer;

/// The kind of receipt, fixing its rid prefix, badge, schema, and store
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiptKind {
    /// Root of a lineage: an artifact enters the amber loop.
    Capture,
    /// A variant evaluated against the captured artifact.
    Eval,
    /// An adjudication label on a prior receipt.
    Label,
    /// Terminal promotion to gold.
    Promote,
}

impl ReceiptKind {
    /// The rid prefix (`ar_...`, `evr_...`, `lbr_...`, `gpr_...`).
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Capture => "ar",
            Self::Eval => "evr",
            Self::Label => "lbr",
            Self::Promote => "gpr",
        }
    }

    /// The badge half of the `what` classification pair.
    pub fn badge(self) -> &'static str {
        match self {
            Self::Capture => "amber",
            Self::Eval => "eval",
            Self::Label => "label",
            Self::Promote => "gold",
        }
    }

    /// The kind half of the `what` classification pair.
    pub fn what_kind(self) -> &'static str {
        match self {
            Self::Capture => "case",
            Self::Eval => "variant",
            Self::Label => "adjudication",
            Self::Promote => "promotion",
        }
    }

    /// The schema version string for this variant.
    pub fn schema(self) -> &'static str {
        match self {
            Self::Capture => "olr/ar.v0.1",
            Self::Eval => "olr/evr.v0.1",
            Self::Label => "olr/lbr.v0.1",
            Self::Promote => "olr/gpr.v0.1",
        }
    }

    /// The per-variant directory name in the store.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Capture => "amber",
            Self::Eval => "eval",
            Self::Label => "label",
            Self::Promote => "promote",
        }
    }

    /// Whether this kind must link to a parent receipt.
    ///
    /// Only parent *presence* is enforced; cross-kind linking (for example
    /// promoting directly from a capture) is a legitimate workflow path.
    pub fn requires_parent(self) -> bool {
        !matches!(self, Self::Capture)
    }

    /// Resolve a kind from a rid prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "ar" => Some(Self::Capture),
            "evr" => Some(Self::Eval),
            "lbr" => Some(Self::Label),
            "gpr" => Some(Self::Promote),
            _ => None,
        }
    }
}

/// A receipt identifier: `{prefix}_{when-with-dashes}_{4-hex}`.
///
/// Assigned once at creation and never mutated. The trailing token gives
/// practical collision avoidance within one process and one second; an
/// actual collision is detected at the store and rejected, never silently
/// overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rid(String);

impl Rid {
    /// Generate a fresh rid for the given kind and `when` timestamp.
    pub fn generate(kind: ReceiptKind, when: &str) -> Self {
        let token: u16 = rand::random();
        Self(format!(
            "{}_{}_{:04x}",
            kind.prefix(),
            when.replace(':', "-"),
            token
        ))
    }

    /// Parse an existing rid, validating the kind prefix and the
    /// `prefix_when_token` shape.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '_');
        let prefix = parts.next().unwrap_or_default();
        ReceiptKind::from_prefix(prefix)
            .ok_or_else(|| CoreError::MalformedReceipt(format!("unknown rid prefix: {s:?}")))?;

        let (Some(when), Some(token)) = (parts.next(), parts.next()) else {
            return Err(CoreError::MalformedReceipt(format!(
                "rid missing segments: {s:?}"
            )));
        };
        let when_ok = when.len() == 20
            && when.ends_with('Z')
            && when.as_bytes()[10] == b'T'
            && !when.contains(':');
        let token_ok = token.len() == 4 && token.chars().all(|c| c.is_ascii_hexdigit());
        if !when_ok || !token_ok {
            return Err(CoreError::MalformedReceipt(format!("malformed rid: {s:?}")));
        }
        Ok(Self(s.to_string()))
    }

    /// The kind encoded in the rid prefix.
    pub fn kind(&self) -> ReceiptKind {
        let prefix = self.0.split('_').next().unwrap_or_default();
        // parse() and generate() guarantee a known prefix
        ReceiptKind::from_prefix(prefix).unwrap_or(ReceiptKind::Capture)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current UTC time as `%Y-%m-%dT%H:%M:%SZ` (second precision).
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Caller-supplied fields for a capture receipt.
///
/// Absent fields take the documented defaults; see [`Default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureParams {
    pub flags: Vec<String>,
    pub metrics: Map<String, Value>,
    pub digests: Map<String, Value>,
    pub triggers: Vec<String>,
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self {
            flags: vec!["amber:unconfirmed".into(), "route:experiment".into()],
            metrics: Map::new(),
            digests: Map::new(),
            triggers: Vec::new(),
        }
    }
}

/// Caller-supplied fields for an eval receipt. `parent` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EvalParams {
    pub parent: Option<String>,
    pub variant: Map<String, Value>,
    pub tests: Vec<Value>,
    pub metrics: Map<String, Value>,
}

/// Caller-supplied fields for a label receipt. `parent` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabelParams {
    pub parent: Option<String>,
    pub label: Map<String, Value>,
}

/// Caller-supplied fields for a promotion receipt. `parent` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromoteParams {
    pub parent: Option<String>,
    pub basis: Map<String, Value>,
    pub policy_checks: Map<String, Value>,
}

/// A sealed receipt: classified fields plus the detached signature in the
/// top-level `sig` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    kind: ReceiptKind,
    rid: Rid,
    fields: Map<String, Value>,
}

impl Receipt {
    /// Rehydrate a receipt from a stored JSON document.
    ///
    /// Validates structure only; use [`Receipt::verify`] to check the
    /// signature.
    pub fn from_value(value: Value) -> Result<Self> {
        let fields = match value {
            Value::Object(map) => map,
            _ => return Err(CoreError::MalformedReceipt("expected object".into())),
        };
        let rid = fields
            .get("rid")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::MalformedReceipt("missing rid".into()))?;
        let rid = Rid::parse(rid)?;
        Ok(Self {
            kind: rid.kind(),
            rid,
            fields,
        })
    }

    /// The receipt kind.
    pub fn kind(&self) -> ReceiptKind {
        self.kind
    }

    /// The receipt identifier.
    pub fn rid(&self) -> &Rid {
        &self.rid
    }

    /// The parent rid, absent for capture receipts.
    pub fn parent(&self) -> Option<&str> {
        self.fields.get("parent").and_then(Value::as_str)
    }

    /// The issuance timestamp.
    pub fn when(&self) -> Option<&str> {
        self.fields.get("when").and_then(Value::as_str)
    }

    /// The hex-encoded detached signature.
    pub fn sig(&self) -> Option<&str> {
        self.fields.get(SIG_FIELD).and_then(Value::as_str)
    }

    /// All fields, including `sig`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The receipt as a JSON value (the mapping returned to callers).
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Verify the detached signature against the canonical bytes of every
    /// field except `sig`.
    pub fn verify(&self, public_key: &PublicKey) -> Result<()> {
        let sig_hex = self
            .sig()
            .ok_or_else(|| CoreError::MalformedReceipt("missing sig".into()))?;
        let signature = SignatureBytes::from_hex(sig_hex)?;
        let message = canonical_bytes(&self.fields)?;
        public_key.verify(&message, &signature)
    }
}

/// Assembles and seals receipts for a single issuer identity.
///
/// Holds a reference to the process signer; one builder per request is
/// cheap to construct.
pub struct ReceiptBuilder<'a> {
    signer: &'a Signer,
    issuer: String,
    host: String,
}

impl<'a> ReceiptBuilder<'a> {
    /// Start building receipts under the given issuer identity.
    pub fn new(signer: &'a Signer, issuer: impl Into<String>) -> Self {
        Self {
            signer,
            issuer: issuer.into(),
            host: "api".into(),
        }
    }

    /// Override the host recorded in capture `where` blocks.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Seal a capture receipt: the root of a lineage, no parent.
    pub fn capture(&self, params: CaptureParams) -> Result<Receipt> {
        let mut fields = Map::new();
        fields.insert(
            "where".into(),
            json!({"host": self.host, "coarse": "device:server"}),
        );
        fields.insert("flags".into(), json!(params.flags));
        fields.insert("metrics".into(), Value::Object(params.metrics));
        fields.insert("digests".into(), Value::Object(params.digests));
        fields.insert("triggers".into(), json!(params.triggers));
        self.seal(ReceiptKind::Capture, None, fields)
    }

    /// Seal an eval receipt extending `params.parent`.
    pub fn eval(&self, params: EvalParams) -> Result<Receipt> {
        let parent = require_parent(params.parent)?;
        let mut fields = Map::new();
        fields.insert("variant".into(), Value::Object(params.variant));
        fields.insert("tests".into(), Value::Array(params.tests));
        fields.insert("metrics".into(), Value::Object(params.metrics));
        self.seal(ReceiptKind::Eval, Some(parent), fields)
    }

    /// Seal a label receipt extending `params.parent`.
    pub fn label(&self, params: LabelParams) -> Result<Receipt> {
        let parent = require_parent(params.parent)?;
        let mut fields = Map::new();
        fields.insert("label".into(), Value::Object(params.label));
        self.seal(ReceiptKind::Label, Some(parent), fields)
    }

    /// Seal a promotion receipt extending `params.parent`.
    pub fn promote(&self, params: PromoteParams) -> Result<Receipt> {
        let parent = require_parent(params.parent)?;
        let mut fields = Map::new();
        fields.insert("basis".into(), Value::Object(params.basis));
        fields.insert("policy_checks".into(), Value::Object(params.policy_checks));
        self.seal(ReceiptKind::Promote, Some(parent), fields)
    }

    /// Attach the common fields, sign everything except `sig`, and attach
    /// the signature last.
    fn seal(
        &self,
        kind: ReceiptKind,
        parent: Option<String>,
        mut fields: Map<String, Value>,
    ) -> Result<Receipt> {
        let when = now_iso();
        let rid = Rid::generate(kind, &when);

        fields.insert("rid".into(), Value::String(rid.to_string()));
        if let Some(parent) = parent {
            fields.insert("parent".into(), Value::String(parent));
        }
        fields.insert("when".into(), Value::String(when));
        fields.insert("issuer".into(), Value::String(self.issuer.clone()));
        fields.insert(
            "what".into(),
            json!({"badge": kind.badge(), "kind": kind.what_kind()}),
        );
        fields.insert("schema".into(), Value::String(kind.schema().into()));
        fields.insert("kid".into(), Value::String(self.signer.kid().into()));

        let sig = self.signer.sign_fields(&fields)?;
        fields.insert(SIG_FIELD.into(), Value::String(sig));

        Ok(Receipt { kind, rid, fields })
    }
}

fn require_parent(parent: Option<String>) -> Result<String> {
    match parent {
        Some(p) if !p.trim().is_empty() => Ok(p),
        _ => Err(CoreError::MissingParent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn test_signer() -> Signer {
        Signer::new(Keypair::derive("dev-seed-change-me-32bytes________"), "dev-1")
    }

    fn assert_rid_shape(rid: &str, prefix: &str) {
        // e.g. ar_2025-01-14T18-40-00Z_0a1b
        let rest = rid
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix('_'))
            .unwrap_or_else(|| panic!("rid {rid:?} missing prefix {prefix}"));
        assert!(!rid.contains(':'), "rid must not contain colons: {rid}");
        assert_eq!(rest.len(), 20 + 1 + 4, "unexpected rid shape: {rid}");
        let token = &rest[21..];
        assert!(
            token.chars().all(|c| c.is_ascii_hexdigit()),
            "token must be hex: {rid}"
        );
    }

    #[test]
    fn test_now_iso_shape() {
        let when = now_iso();
        assert_eq!(when.len(), 20);
        assert!(when.ends_with('Z'));
        assert_eq!(&when[10..11], "T");
    }

    #[test]
    fn test_capture_shape_and_verifies() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");

        let receipt = builder.capture(CaptureParams::default()).unwrap();

        assert_eq!(receipt.kind(), ReceiptKind::Capture);
        assert_rid_shape(receipt.rid().as_str(), "ar");
        assert!(receipt.parent().is_none());
        assert_eq!(
            receipt.fields()["what"],
            json!({"badge": "amber", "kind": "case"})
        );
        assert_eq!(receipt.fields()["schema"], json!("olr/ar.v0.1"));
        assert_eq!(receipt.fields()["kid"], json!("dev-1"));
        assert_eq!(
            receipt.fields()["flags"],
            json!(["amber:unconfirmed", "route:experiment"])
        );
        assert_eq!(receipt.fields()["metrics"], json!({}));
        assert_eq!(receipt.fields()["digests"], json!({}));
        assert_eq!(receipt.fields()["triggers"], json!([]));

        receipt.verify(&signer.public_key()).unwrap();
    }

    #[test]
    fn test_capture_caller_fields_override_defaults() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");

        let params: CaptureParams =
            serde_json::from_value(json!({"flags": ["x"], "metrics": {"a": 1}})).unwrap();
        let receipt = builder.capture(params).unwrap();

        assert_eq!(receipt.fields()["flags"], json!(["x"]));
        assert_eq!(receipt.fields()["metrics"], json!({"a": 1}));
        // untouched fields keep their defaults
        assert_eq!(receipt.fields()["digests"], json!({}));
    }

    #[test]
    fn test_eval_requires_parent() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");

        let missing: EvalParams = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            builder.eval(missing),
            Err(CoreError::MissingParent)
        ));

        let empty: EvalParams = serde_json::from_value(json!({"parent": ""})).unwrap();
        assert!(matches!(builder.eval(empty), Err(CoreError::MissingParent)));
    }

    #[test]
    fn test_eval_links_parent() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");

        let capture = builder.capture(CaptureParams::default()).unwrap();
        let params: EvalParams =
            serde_json::from_value(json!({"parent": capture.rid().as_str()})).unwrap();
        let eval = builder.eval(params).unwrap();

        assert_eq!(eval.kind(), ReceiptKind::Eval);
        assert_rid_shape(eval.rid().as_str(), "evr");
        assert_eq!(eval.parent(), Some(capture.rid().as_str()));
        assert_eq!(
            eval.fields()["what"],
            json!({"badge": "eval", "kind": "variant"})
        );
        assert_eq!(eval.fields()["schema"], json!("olr/evr.v0.1"));
        eval.verify(&signer.public_key()).unwrap();
    }

    #[test]
    fn test_label_and_promote_shapes() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");

        let label = builder
            .label(LabelParams {
                parent: Some("ar_x".into()),
                ..Default::default()
            })
            .unwrap();
        assert_rid_shape(label.rid().as_str(), "lbr");
        assert_eq!(
            label.fields()["what"],
            json!({"badge": "label", "kind": "adjudication"})
        );
        assert_eq!(label.fields()["label"], json!({}));
        label.verify(&signer.public_key()).unwrap();

        let promote = builder
            .promote(PromoteParams {
                parent: Some(label.rid().to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_rid_shape(promote.rid().as_str(), "gpr");
        assert_eq!(
            promote.fields()["what"],
            json!({"badge": "gold", "kind": "promotion"})
        );
        assert_eq!(promote.fields()["schema"], json!("olr/gpr.v0.1"));
        assert_eq!(promote.fields()["policy_checks"], json!({}));
        promote.verify(&signer.public_key()).unwrap();
    }

    #[test]
    fn test_cross_kind_parent_allowed() {
        // Promoting directly from a capture is a legitimate path.
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");

        let capture = builder.capture(CaptureParams::default()).unwrap();
        let promote = builder
            .promote(PromoteParams {
                parent: Some(capture.rid().to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(promote.parent(), Some(capture.rid().as_str()));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");
        let receipt = builder.capture(CaptureParams::default()).unwrap();

        let other = Keypair::derive("some other seed").public_key();
        assert!(matches!(
            receipt.verify(&other),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_tampered_field() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");
        let receipt = builder.capture(CaptureParams::default()).unwrap();

        let mut value = receipt.to_value();
        value["issuer"] = json!("did:web:evil.example");
        let tampered = Receipt::from_value(value).unwrap();
        assert!(tampered.verify(&signer.public_key()).is_err());
    }

    #[test]
    fn test_from_value_roundtrip() {
        let signer = test_signer();
        let builder = ReceiptBuilder::new(&signer, "did:web:openline.local");
        let receipt = builder.capture(CaptureParams::default()).unwrap();

        let rehydrated = Receipt::from_value(receipt.to_value()).unwrap();
        assert_eq!(rehydrated, receipt);
        rehydrated.verify(&signer.public_key()).unwrap();
    }

    #[test]
    fn test_from_value_rejects_bad_shapes() {
        assert!(Receipt::from_value(json!([1, 2])).is_err());
        assert!(Receipt::from_value(json!({"no": "rid"})).is_err());
        assert!(Receipt::from_value(json!({"rid": "zzz_123"})).is_err());
    }

    #[test]
    fn test_rid_kind_from_prefix() {
        let rid = Rid::generate(ReceiptKind::Promote, &now_iso());
        assert_eq!(rid.kind(), ReceiptKind::Promote);
        assert_eq!(Rid::parse(rid.as_str()).unwrap(), rid);
    }

    #[test]
    fn test_rid_parse_requires_full_shape() {
        assert!(Rid::parse("ar_2025-01-14T18-40-00Z_0a1b").is_ok());

        // A known prefix alone is not a rid.
        assert!(Rid::parse("ar").is_err());
        assert!(Rid::parse("ar_").is_err());
        assert!(Rid::parse("ar_2025-01-14").is_err());
        // Timestamp must keep the generated shape.
        assert!(Rid::parse("ar_2025-01-14T18:40:00Z_0a1b").is_err());
        assert!(Rid::parse("ar_2025-01-14T18-40-00X_0a1b").is_err());
        // Token must be four hex digits.
        assert!(Rid::parse("ar_2025-01-14T18-40-00Z_zzzz").is_err());
        assert!(Rid::parse("ar_2025-01-14T18-40-00Z_0a1bc").is_err());
    }

    #[test]
    fn test_what_kind_pairs() {
        for (kind, badge, what) in [
            (ReceiptKind::Capture, "amber", "case"),
            (ReceiptKind::Eval, "eval", "variant"),
            (ReceiptKind::Label, "label", "adjudication"),
            (ReceiptKind::Promote, "gold", "promotion"),
        ] {
            assert_eq!(kind.badge(), badge);
            assert_eq!(kind.what_kind(), what);
        }
    }
}
