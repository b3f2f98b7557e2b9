#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use imdaz::{validation::Validator, StudentFields, StudentModel};

/// Request body with every required field filled in
pub fn student_payload(nome: &str) -> Map<String, Value> {
    json!({
        "nome": nome,
        "cep": "93000-000",
        "rua": "Rua Independência",
        "bairro": "Centro",
        "cidade": "São Leopoldo",
        "numero": "45",
        "cpf": "987.654.321-00",
        "rg": "9876543210",
        "emissao_rg": "2021-03-10",
        "nascimento": "2014-08-22",
        "genero_id": 2,
        "etnia_id": 1,
        "escola_id": 3,
        "tipo_residencia_id": 1,
        "tipo_parentesco_id": 2,
        "nome_responsavel": "Joana Souza",
        "nome_mae": "Joana Souza",
        "alfabetizado": "sim"
    })
    .as_object()
    .cloned()
    .unwrap()
}

pub const ACCOUNT_PASSWORD: &str = "coordenacao-2024";

/// Registration body for a staff account
pub fn account_payload(name: &str, email: &str) -> Value {
    json!({ "name": name, "email": email, "password": ACCOUNT_PASSWORD })
}

/// Stored student built straight from a payload, bypassing HTTP
pub fn student(id: i32, nome: &str, nascimento: NaiveDate) -> StudentModel {
    let mut payload = student_payload(nome);
    payload.insert("nascimento".to_string(), json!(nascimento.to_string()));
    let validated = Validator::validate(&payload, &StudentFields::schema()).unwrap();
    StudentModel::new(id, StudentFields::from_validated(validated).unwrap())
}

/// Birth date whose anniversary falls `days` from today
pub fn birthday_in(days: i64, birth_year: i32) -> NaiveDate {
    let target = Utc::now().date_naive() + Duration::days(days);
    // Feb 29 has no counterpart in most years
    target
        .with_year(birth_year)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(birth_year, 3, 1).unwrap())
}
