use serde::{Deserialize, Serialize};

/// The two invoice layouts the editor can produce.
///
/// `type1` is the classic proposal layout (notes as a bullet list, a single
/// lump-sum total); `type2` is the modern layout (free-form description and
/// notes). The wire names match the documents stored by earlier versions of
/// the application, so saved history entries stay loadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    #[serde(rename = "type1")]
    Classic,
    #[serde(rename = "type2")]
    Modern,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Classic => "type1",
            TemplateKind::Modern => "type2",
        }
    }

    pub fn from_str(s: &str) -> Option<TemplateKind> {
        match s {
            "type1" => Some(TemplateKind::Classic),
            "type2" => Some(TemplateKind::Modern),
            _ => None,
        }
    }
}

/// Editable invoice content, tagged by template.
///
/// The payload shape and the template tag travel together as one enum, so a
/// record can never carry a `type1` tag with a `type2` body or vice versa.
/// Every serializer, renderer and exporter matches exhaustively on this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "templateType", content = "data")]
pub enum InvoicePayload {
    #[serde(rename = "type1")]
    Classic(ClassicInvoice),
    #[serde(rename = "type2")]
    Modern(ModernInvoice),
}

impl InvoicePayload {
    pub fn template_kind(&self) -> TemplateKind {
        match self {
            InvoicePayload::Classic(_) => TemplateKind::Classic,
            InvoicePayload::Modern(_) => TemplateKind::Modern,
        }
    }

    /// The proposal number shown on the document, used for file naming.
    pub fn proposal_number(&self) -> &str {
        match self {
            InvoicePayload::Classic(inv) => &inv.client.proposal_num,
            InvoicePayload::Modern(inv) => &inv.proposal.number,
        }
    }

    /// Fresh payload for a template, used when an editor workspace starts
    /// (or restarts after a template switch).
    pub fn default_for(kind: TemplateKind) -> InvoicePayload {
        match kind {
            TemplateKind::Classic => InvoicePayload::Classic(ClassicInvoice::default()),
            TemplateKind::Modern => InvoicePayload::Modern(ModernInvoice::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassicCompany {
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub phone: String,
    pub emails: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassicClient {
    pub proposal_num: String,
    pub date: String,
    pub name: String,
    pub email: String,
    pub address: String,
}

/// Classic proposal layout: scope of work, lump-sum total, bulleted notes
/// and a disclaimer block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassicInvoice {
    pub company: ClassicCompany,
    pub client: ClassicClient,
    pub scope_of_work: String,
    pub lump_sum_total: String,
    pub notes: Vec<String>,
    pub disclaimer: String,
}

impl Default for ClassicInvoice {
    fn default() -> Self {
        ClassicInvoice {
            company: ClassicCompany {
                name: "Your Company Name".to_string(),
                address1: "Street Address".to_string(),
                address2: "City, State ZIP".to_string(),
                phone: "(000) 000-0000".to_string(),
                emails: "info@example.com".to_string(),
            },
            client: ClassicClient {
                proposal_num: "P-0001".to_string(),
                date: "Date".to_string(),
                name: "Name of Client".to_string(),
                email: "Client Email Address".to_string(),
                address: "Client Mailing Address".to_string(),
            },
            scope_of_work: "Describe the scope of work here.".to_string(),
            lump_sum_total: "0.00".to_string(),
            notes: vec![
                "Labor only. Materials purchased on behalf of the client.".to_string(),
                "Receipts for material purchases will be provided for reimbursement.".to_string(),
            ],
            disclaimer: "This proposal covers the scope of work described above only. \
                         Additional work may require a separate agreement and cost."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernCompany {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernProposal {
    pub number: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernClient {
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub pcn: String,
}

/// Modern proposal layout: project scope, free-form description, single
/// amount and a notes paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModernInvoice {
    pub company: ModernCompany,
    pub proposal: ModernProposal,
    pub client: ModernClient,
    pub project_scope: String,
    pub description: String,
    pub amount: String,
    pub notes: String,
}

impl Default for ModernInvoice {
    fn default() -> Self {
        ModernInvoice {
            company: ModernCompany {
                name: "Your Company Name".to_string(),
                address: "Street Address, City, State ZIP".to_string(),
                email: "info@example.com".to_string(),
                phone: "(000) 000-0000".to_string(),
            },
            proposal: ModernProposal {
                number: "P-0001".to_string(),
                date: "Date".to_string(),
            },
            client: ModernClient {
                name: "Name of Client".to_string(),
                address1: "Client Street Address".to_string(),
                address2: "Client City, State ZIP".to_string(),
                pcn: "PCN".to_string(),
            },
            project_scope: "Project scope".to_string(),
            description: "Describe the work here.".to_string(),
            amount: "0.00".to_string(),
            notes: "Notes".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_wire_template_tags() {
        let classic = InvoicePayload::default_for(TemplateKind::Classic);
        let json = serde_json::to_value(&classic).unwrap();
        assert_eq!(json["templateType"], "type1");
        assert!(json["data"]["scopeOfWork"].is_string());

        let modern = InvoicePayload::default_for(TemplateKind::Modern);
        let json = serde_json::to_value(&modern).unwrap();
        assert_eq!(json["templateType"], "type2");
        assert!(json["data"]["projectScope"].is_string());
    }

    #[test]
    fn payload_round_trips_through_json() {
        for kind in [TemplateKind::Classic, TemplateKind::Modern] {
            let payload = InvoicePayload::default_for(kind);
            let json = serde_json::to_string(&payload).unwrap();
            let back: InvoicePayload = serde_json::from_str(&json).unwrap();
            assert_eq!(back, payload);
            assert_eq!(back.template_kind(), kind);
        }
    }

    #[test]
    fn mismatched_tag_and_body_is_rejected() {
        // A type2 tag with a type1 body must not deserialize.
        let classic = InvoicePayload::default_for(TemplateKind::Classic);
        let mut json = serde_json::to_value(&classic).unwrap();
        json["templateType"] = serde_json::Value::String("type2".to_string());
        assert!(serde_json::from_value::<InvoicePayload>(json).is_err());
    }

    #[test]
    fn template_kind_wire_names_round_trip() {
        assert_eq!(TemplateKind::from_str("type1"), Some(TemplateKind::Classic));
        assert_eq!(TemplateKind::from_str("type2"), Some(TemplateKind::Modern));
        assert_eq!(TemplateKind::from_str("type3"), None);
        assert_eq!(TemplateKind::Classic.as_str(), "type1");
        assert_eq!(TemplateKind::Modern.as_str(), "type2");
    }
}
