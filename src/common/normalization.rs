// src/common/normalization.rs

use serde_json::Value;

/// Funções puras de normalização dos campos de identidade do lead.
/// Nenhuma delas falha: entrada vazia ou inútil vira `None`.

pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim().to_lowercase();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Remove tudo que não for dígito. Números com mais de 11 dígitos perdem o
/// prefixo (DDI) e ficam só com os últimos 11 — formato nacional brasileiro.
pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.len() > 11 {
        // Cuidado: números estrangeiros também são truncados aqui.
        let cut = digits.len() - 11;
        return Some(digits[cut..].to_string());
    }
    Some(digits)
}

pub fn normalize_name(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// CNPJ (ou CPF) cru vira só dígitos; vazio vira None.
pub fn normalize_cnpj(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Merge raso dos extras (coluna JSONB `data`).
///
/// - Se um dos lados não existir, retorna o outro.
/// - Nas chaves em comum, o ENTRANTE vence (é o payload mais fresco) — ao
///   contrário dos campos escalares do lead, onde o existente vence.
/// - Se algum lado não for um objeto JSON, mantém o existente como está.
pub fn merge_extras(existing: Option<&Value>, incoming: Option<&Value>) -> Option<Value> {
    match (existing, incoming) {
        (None, None) => None,
        (None, Some(inc)) => Some(inc.clone()),
        (Some(cur), None) => Some(cur.clone()),
        (Some(cur), Some(inc)) => match (cur.as_object(), inc.as_object()) {
            (Some(cur_map), Some(inc_map)) => {
                let mut merged = cur_map.clone();
                for (key, value) in inc_map {
                    merged.insert(key.clone(), value.clone());
                }
                Some(Value::Object(merged))
            }
            // Lado corrompido: preserva o que já existia para não regredir.
            _ => Some(cur.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_trim_e_lowercase() {
        assert_eq!(
            normalize_email(Some("  Ana@Exemplo.COM ")),
            Some("ana@exemplo.com".to_string())
        );
        assert_eq!(normalize_email(Some("   ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn phone_so_digitos() {
        assert_eq!(
            normalize_phone(Some("(11) 99999-8888")),
            Some("11999998888".to_string())
        );
        assert_eq!(normalize_phone(Some("abc")), None);
        assert_eq!(normalize_phone(None), None);
    }

    #[test]
    fn phone_mantem_ultimos_11_digitos() {
        // +55 11 99999-8888 → 13 dígitos → descarta o DDI
        assert_eq!(
            normalize_phone(Some("+55 11 99999-8888")),
            Some("11999998888".to_string())
        );
    }

    #[test]
    fn name_trim() {
        assert_eq!(normalize_name(Some("  Ana ")), Some("Ana".to_string()));
        assert_eq!(normalize_name(Some(" ")), None);
    }

    #[test]
    fn cnpj_so_digitos() {
        assert_eq!(
            normalize_cnpj(Some("12.345.678/0001-90")),
            Some("12345678000190".to_string())
        );
        assert_eq!(normalize_cnpj(Some("--")), None);
    }

    #[test]
    fn extras_uniao_com_prioridade_do_entrante() {
        let cur = json!({"a": 1, "b": 2});
        let inc = json!({"b": 3, "c": 4});
        assert_eq!(
            merge_extras(Some(&cur), Some(&inc)),
            Some(json!({"a": 1, "b": 3, "c": 4}))
        );
    }

    #[test]
    fn extras_lado_unico_passa_direto() {
        let inc = json!({"x": true});
        assert_eq!(merge_extras(None, Some(&inc)), Some(inc.clone()));
        assert_eq!(merge_extras(Some(&inc), None), Some(inc));
        assert_eq!(merge_extras(None, None), None);
    }

    #[test]
    fn extras_corrompido_preserva_existente() {
        let cur = json!({"a": 1});
        let inc = json!("nao sou um objeto");
        assert_eq!(merge_extras(Some(&cur), Some(&inc)), Some(cur));
    }
}
