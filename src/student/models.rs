use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

use crate::shared::AppError;
use crate::validation::{FieldKind, FieldRule, FieldSchema};

const STUDENT_RULES: &[FieldRule] = &[
    FieldRule::required("nome", FieldKind::Text),
    FieldRule::required("cep", FieldKind::Text),
    FieldRule::required("rua", FieldKind::Text),
    FieldRule::required("bairro", FieldKind::Text),
    FieldRule::required("cidade", FieldKind::Text),
    FieldRule::required("numero", FieldKind::Text),
    FieldRule::required("cpf", FieldKind::Text),
    FieldRule::required("rg", FieldKind::Text),
    FieldRule::required("emissao_rg", FieldKind::Date),
    FieldRule::required("nascimento", FieldKind::Date),
    FieldRule::required("genero_id", FieldKind::Integer),
    FieldRule::required("etnia_id", FieldKind::Integer),
    FieldRule::required("escola_id", FieldKind::Integer),
    FieldRule::required("tipo_residencia_id", FieldKind::Integer),
    FieldRule::required("tipo_parentesco_id", FieldKind::Integer),
    FieldRule::required("nome_responsavel", FieldKind::Text),
    FieldRule::required("nome_mae", FieldKind::Text),
    FieldRule::required("alfabetizado", FieldKind::Boolean),
    FieldRule::optional("nis", FieldKind::Text),
    FieldRule::optional("telefone", FieldKind::Text),
    FieldRule::optional("deficiencias", FieldKind::Text),
    FieldRule::optional("mae_trabalha_fora", FieldKind::Boolean),
    FieldRule::optional("mae_interesse_projetos", FieldKind::Boolean),
    FieldRule::optional("renda_familiar_mensal", FieldKind::Decimal),
    FieldRule::optional("quantidade_filhos", FieldKind::Integer),
    FieldRule::optional("possui_irmao_instituicao", FieldKind::Boolean),
    FieldRule::optional("recebe_bolsa_familia", FieldKind::Boolean),
    FieldRule::optional("direito_imagem", FieldKind::Boolean),
    FieldRule::optional("possui_banheiro", FieldKind::Boolean),
    FieldRule::optional("possui_agua", FieldKind::Boolean),
    FieldRule::optional("possui_luz", FieldKind::Boolean),
    FieldRule::optional("nota_fiscal_gaucha", FieldKind::Boolean),
];

/// Database model for the imdaz_alunos table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct StudentModel {
    pub id: i32,
    pub nome: String,
    pub cep: String,
    pub rua: String,
    pub bairro: String,
    pub cidade: String,
    pub numero: String,
    pub cpf: String,
    pub rg: String,
    pub emissao_rg: NaiveDate,
    pub nascimento: NaiveDate,
    pub genero_id: i32,
    pub etnia_id: i32,
    pub escola_id: i32,
    pub tipo_residencia_id: i32,
    pub tipo_parentesco_id: i32,
    pub nome_responsavel: String,
    pub nome_mae: String,
    pub alfabetizado: bool,
    pub nis: Option<String>,
    pub telefone: Option<String>,
    pub deficiencias: Option<String>,
    pub mae_trabalha_fora: Option<bool>,
    pub mae_interesse_projetos: Option<bool>,
    pub renda_familiar_mensal: Option<f64>,
    pub quantidade_filhos: Option<i32>,
    pub possui_irmao_instituicao: Option<bool>,
    pub recebe_bolsa_familia: Option<bool>,
    pub direito_imagem: Option<bool>,
    pub possui_banheiro: Option<bool>,
    pub possui_agua: Option<bool>,
    pub possui_luz: Option<bool>,
    pub nota_fiscal_gaucha: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated student payload: every column except id and timestamps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentFields {
    pub nome: String,
    pub cep: String,
    pub rua: String,
    pub bairro: String,
    pub cidade: String,
    pub numero: String,
    pub cpf: String,
    pub rg: String,
    pub emissao_rg: NaiveDate,
    pub nascimento: NaiveDate,
    pub genero_id: i32,
    pub etnia_id: i32,
    pub escola_id: i32,
    pub tipo_residencia_id: i32,
    pub tipo_parentesco_id: i32,
    pub nome_responsavel: String,
    pub nome_mae: String,
    pub alfabetizado: bool,
    pub nis: Option<String>,
    pub telefone: Option<String>,
    pub deficiencias: Option<String>,
    pub mae_trabalha_fora: Option<bool>,
    pub mae_interesse_projetos: Option<bool>,
    pub renda_familiar_mensal: Option<f64>,
    pub quantidade_filhos: Option<i32>,
    pub possui_irmao_instituicao: Option<bool>,
    pub recebe_bolsa_familia: Option<bool>,
    pub direito_imagem: Option<bool>,
    pub possui_banheiro: Option<bool>,
    pub possui_agua: Option<bool>,
    pub possui_luz: Option<bool>,
    pub nota_fiscal_gaucha: Option<bool>,
}

impl StudentFields {
    /// Field rules applied to create and update payloads
    pub const fn schema() -> FieldSchema {
        FieldSchema::new(STUDENT_RULES)
    }

    /// Builds the typed payload from validator output
    pub fn from_validated(fields: Map<String, Value>) -> Result<Self, AppError> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::Validation(e.to_string()))
    }
}

impl StudentModel {
    /// Creates a student model with fresh timestamps
    pub fn new(id: i32, fields: StudentFields) -> Self {
        let now = Utc::now();
        let StudentFields {
            nome,
            cep,
            rua,
            bairro,
            cidade,
            numero,
            cpf,
            rg,
            emissao_rg,
            nascimento,
            genero_id,
            etnia_id,
            escola_id,
            tipo_residencia_id,
            tipo_parentesco_id,
            nome_responsavel,
            nome_mae,
            alfabetizado,
            nis,
            telefone,
            deficiencias,
            mae_trabalha_fora,
            mae_interesse_projetos,
            renda_familiar_mensal,
            quantidade_filhos,
            possui_irmao_instituicao,
            recebe_bolsa_familia,
            direito_imagem,
            possui_banheiro,
            possui_agua,
            possui_luz,
            nota_fiscal_gaucha,
        } = fields;

        Self {
            id,
            nome,
            cep,
            rua,
            bairro,
            cidade,
            numero,
            cpf,
            rg,
            emissao_rg,
            nascimento,
            genero_id,
            etnia_id,
            escola_id,
            tipo_residencia_id,
            tipo_parentesco_id,
            nome_responsavel,
            nome_mae,
            alfabetizado,
            nis,
            telefone,
            deficiencias,
            mae_trabalha_fora,
            mae_interesse_projetos,
            renda_familiar_mensal,
            quantidade_filhos,
            possui_irmao_instituicao,
            recebe_bolsa_familia,
            direito_imagem,
            possui_banheiro,
            possui_agua,
            possui_luz,
            nota_fiscal_gaucha,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces every field and refreshes updated_at. The id never changes.
    pub fn apply(&mut self, fields: StudentFields) {
        let created_at = self.created_at;
        *self = Self {
            created_at,
            ..Self::new(self.id, fields)
        };
    }

    /// Days from `from` until the next birthday, zero when it is that day.
    /// Born on Feb 29 and no leap day within a year yields 366.
    pub fn days_until_birthday(&self, from: NaiveDate) -> i64 {
        (0..366)
            .find(|&offset| {
                let day = from + Duration::days(offset);
                day.month() == self.nascimento.month() && day.day() == self.nascimento.day()
            })
            .unwrap_or(366)
    }

    /// Checks whether the birthday falls on `from` or the following `days - 1` days
    pub fn has_birthday_within(&self, from: NaiveDate, days: u32) -> bool {
        self.days_until_birthday(from) < i64::from(days)
    }
}

/// Database model for the imdaz_alunos_turmas join table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentModel {
    pub id: i32,
    pub aluno_id: i32,
    pub turma_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnrollmentModel {
    pub fn new(id: i32, aluno_id: i32, turma_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id,
            aluno_id,
            turma_id,
            created_at: now,
            updated_at: now,
        }
    }
}
