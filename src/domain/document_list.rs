use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slot::slot_key;

/// Appended to the name of a duplicated list.
pub const COPY_SUFFIX: &str = " (Copie)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListCategory {
    #[default]
    Location,
    Achat,
    Credit,
    Autre,
}

impl ListCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListCategory::Location => "location",
            ListCategory::Achat => "achat",
            ListCategory::Credit => "credit",
            ListCategory::Autre => "autre",
        }
    }
}

impl fmt::Display for ListCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "location" => Ok(ListCategory::Location),
            "achat" => Ok(ListCategory::Achat),
            "credit" => Ok(ListCategory::Credit),
            "autre" => Ok(ListCategory::Autre),
            other => Err(format!("unknown list category '{other}'")),
        }
    }
}

/// One requested document: shared by templates and requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl DocumentDefinition {
    pub fn new(name: &str, description: Option<&str>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
            required,
        }
    }
}

/// Trims names and descriptions, failing on an empty list, a blank name, or two
/// names that map to the same upload slot.
pub fn normalize_documents(
    documents: Vec<DocumentDefinition>,
) -> Result<Vec<DocumentDefinition>, String> {
    if documents.is_empty() {
        return Err("at least one document is required".to_string());
    }

    let mut keys = HashSet::with_capacity(documents.len());
    documents
        .into_iter()
        .map(|document| {
            let name = document.name.trim();
            if name.is_empty() {
                return Err("document name must not be empty".to_string());
            }
            let key = slot_key(name);
            if key.is_empty() {
                return Err(format!(
                    "document name '{name}' must contain letters or digits"
                ));
            }
            if !keys.insert(key) {
                return Err(format!("document '{name}' is listed twice"));
            }
            let description = document
                .description
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
            Ok(DocumentDefinition {
                name: name.to_string(),
                description,
                required: document.required,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentList {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: ListCategory,
    pub documents: Vec<DocumentDefinition>,
    pub is_template: bool,
    pub usage_count: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentList {
    /// Documents pre-selected when a professional picks this list.
    pub fn required_documents(&self) -> Vec<&DocumentDefinition> {
        self.documents.iter().filter(|doc| doc.required).collect()
    }

    pub fn duplicate_for(&self, owner: Uuid) -> NewDocumentList {
        NewDocumentList {
            id: Uuid::new_v4(),
            name: format!("{}{}", self.name, COPY_SUFFIX),
            description: self.description.clone(),
            category: self.category,
            documents: self.documents.clone(),
            is_template: self.is_template,
            created_by: owner,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDocumentList {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: ListCategory,
    pub documents: Vec<DocumentDefinition>,
    pub is_template: bool,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentListDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: ListCategory,
    pub documents: Vec<DocumentDefinition>,
    #[serde(default = "default_is_template")]
    pub is_template: bool,
}

fn default_is_template() -> bool {
    true
}

impl DocumentListDraft {
    pub fn into_new_list(self, owner: Uuid) -> Result<NewDocumentList, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("list name must not be empty".to_string());
        }
        Ok(NewDocumentList {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            documents: normalize_documents(self.documents)?,
            is_template: self.is_template,
            created_by: owner,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentListUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ListCategory>,
    pub documents: Option<Vec<DocumentDefinition>>,
    pub is_template: Option<bool>,
}

impl DocumentListUpdate {
    pub fn apply(self, current: &DocumentList) -> Result<DocumentListChanges, String> {
        let name = match self.name {
            Some(value) if value.trim().is_empty() => {
                return Err("list name must not be empty".to_string())
            }
            Some(value) => value.trim().to_string(),
            None => current.name.clone(),
        };
        let documents = match self.documents {
            Some(documents) => normalize_documents(documents)?,
            None => current.documents.clone(),
        };
        Ok(DocumentListChanges {
            name,
            description: self
                .description
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| current.description.clone()),
            category: self.category.unwrap_or(current.category),
            documents,
            is_template: self.is_template.unwrap_or(current.is_template),
        })
    }
}

/// Full replacement of the editable columns of a list.
#[derive(Debug, Clone)]
pub struct DocumentListChanges {
    pub name: String,
    pub description: String,
    pub category: ListCategory,
    pub documents: Vec<DocumentDefinition>,
    pub is_template: bool,
}

/// Starter lists offered to a new professional.
pub fn sample_lists(owner: Uuid) -> Vec<NewDocumentList> {
    let list = |name: &str,
                description: &str,
                category: ListCategory,
                documents: Vec<DocumentDefinition>| NewDocumentList {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        documents,
        is_template: true,
        created_by: owner,
    };

    vec![
        list(
            "Dossier Location Standard",
            "Documents requis pour une demande de location immobilière",
            ListCategory::Location,
            vec![
                DocumentDefinition::new("Carte d'identité", Some("En cours de validité"), true),
                DocumentDefinition::new(
                    "Justificatif de domicile",
                    Some("Facture de moins de 3 mois"),
                    true,
                ),
                DocumentDefinition::new(
                    "3 derniers bulletins de salaire",
                    Some("Bulletins récents"),
                    true,
                ),
                DocumentDefinition::new("Contrat de travail", Some("CDI ou CDD"), true),
                DocumentDefinition::new("Relevé d'identité bancaire", Some("RIB récent"), true),
            ],
        ),
        list(
            "Dossier Crédit Immobilier",
            "Documents pour une demande de prêt immobilier",
            ListCategory::Credit,
            vec![
                DocumentDefinition::new(
                    "Pièce d'identité",
                    Some("Carte d'identité ou passeport"),
                    true,
                ),
                DocumentDefinition::new(
                    "Justificatifs de revenus",
                    Some("3 derniers bulletins de salaire"),
                    true,
                ),
                DocumentDefinition::new("Relevés bancaires", Some("3 derniers mois"), true),
                DocumentDefinition::new(
                    "Avis d'imposition",
                    Some("Dernier avis d'imposition"),
                    true,
                ),
                DocumentDefinition::new("Compromis de vente", Some("Signé par les parties"), true),
            ],
        ),
        list(
            "Dossier Achat Particulier",
            "Documents pour un achat immobilier entre particuliers",
            ListCategory::Achat,
            vec![
                DocumentDefinition::new("Carte d'identité", Some("En cours de validité"), true),
                DocumentDefinition::new(
                    "Justificatif de revenus",
                    Some("Bulletins de salaire ou bilan"),
                    true,
                ),
                DocumentDefinition::new(
                    "Attestation de financement",
                    Some("Banque ou organisme de crédit"),
                    true,
                ),
                DocumentDefinition::new(
                    "Assurance habitation",
                    Some("Attestation d'assurance"),
                    false,
                ),
            ],
        ),
    ]
}
