//! Prompt text for the reasoning service.

use std::fmt::Write;

use super::{AddressRequestItem, ContractorRequestItem};

/// Task framing for address extraction.
pub const ADDRESS_SYSTEM_PROMPT: &str = "\
You extract structured data from Polish bank transfer descriptions for a \
housing community bookkeeping system.

For every transaction find:
1. Street name (normalize to \"Joliot-Curie\")
2. Building number (e.g. \"3\")
3. Apartment number (e.g. \"27\"); this is the most important field
4. Tenant name: the person paying, in Title Case

Known spellings of the address:
- \"Joliot-Curie 3/27\" means building 3, apartment 27
- \"JOLIOT CURIE 3 M.11\", \"J.CURIE 3/27\", \"JCURIE 3/34\"
- \"IDENTYFIKATOR: 27/4\" and \"lokal ID 27/7\" are reliable identifiers

Descriptions may be truncated, misspelled or contain broken characters.

Rules:
- Give a confidence from 0 to 100 for address, apartment and tenantName
- Use null for anything you cannot find with reasonable confidence
- Explain each answer in one short sentence
- Answer with JSON only";

/// Worked examples shown before the batch.
pub const ADDRESS_EXAMPLES: &str = r#"Worked examples:

Example 1
  DESC-BASE: "FUNDUSZ REMONTOWY"
  DESC-OPT: "EWA TERESA OSIECKA-CISOWSKA UL. JOLIOT-CURIE 3/27 02-646 WARSZAWA"
  Answer:
  {"streetName": "Joliot-Curie", "buildingNumber": "3", "apartmentNumber": "27",
   "fullAddress": "Joliot-Curie 3/27", "tenantName": "Ewa Teresa Osiecka-Cisowska",
   "confidence": {"address": 95, "apartment": 95, "tenantName": 90},
   "reasoning": "Address 3/27 in desc-opt, name before UL."}

Example 2
  DESC-BASE: "CZYNSZ I FUNDUSZ REMONTOWY ZA LOKALJOLIOT-CURIE 3/4 IDENTYFIKATOR: 27/4"
  DESC-OPT: "SYLWESTER ŚCIŚLEWSKI  UL.JOLIOT-CURIE 3 M.4 02-646 WARSZAWA"
  Answer:
  {"streetName": "Joliot-Curie", "buildingNumber": "3", "apartmentNumber": "4",
   "fullAddress": "Joliot-Curie 3/4", "tenantName": "Sylwester Ściślewski",
   "confidence": {"address": 98, "apartment": 98, "tenantName": 95},
   "reasoning": "Identifier 27/4 and address 3 M.4 agree on apartment 4"}

Example 3
  DESC-BASE: "Op�aty eksploatacyjne i za funduszremontowy lokalu 17"
  DESC-OPT: "KOSKA DANIEL  UL RÓŻANA 11 77-100 RZEPNICA"
  Answer:
  {"streetName": null, "buildingNumber": null, "apartmentNumber": "17",
   "fullAddress": null, "tenantName": "Daniel Koska",
   "confidence": {"address": 0, "apartment": 70, "tenantName": 85},
   "reasoning": "Only 'lokalu 17' names the unit; desc-opt holds a mailing address elsewhere"}"#;

const ADDRESS_SCHEMA: &str = r#"Answer with a JSON object of exactly this shape, one entry per transaction:
{
  "results": [
    {
      "index": 0,
      "streetName": "Joliot-Curie" | null,
      "buildingNumber": "3" | null,
      "apartmentNumber": "27" | null,
      "fullAddress": "Joliot-Curie 3/27" | null,
      "tenantName": "Ewa Teresa Osiecka-Cisowska" | null,
      "confidence": {"address": 95, "apartment": 90, "tenantName": 85},
      "reasoning": "short explanation"
    }
  ]
}"#;

/// Task framing for contractor matching.
pub const CONTRACTOR_SYSTEM_PROMPT: &str = r#"Przypisz transakcje bankowe do kontrahentów z listy kandydatów.

ZASADY:
1. Czytaj DESC-BASE i DESC-OPT, DESC-OPT ma pierwszeństwo
2. Szukaj nazw firm i instytucji
3. Dopuszczalne są skróty, akronimy i częściowe nazwy
4. Wielkość liter nie ma znaczenia
5. Pewność (0-100):
   - 90-100: pełna nazwa w opisie
   - 70-89: część nazwy lub akronim
   - 50-69: prawdopodobne
   - poniżej 50: zwróć null
6. Wybieraj wyłącznie spośród podanych kandydatów

Format JSON:
{
  "results": [
    {
      "index": 0,
      "contractorId": 123 lub null,
      "confidence": 85,
      "matchedIn": "desc-opt" | "desc-base" | "none",
      "reasoning": "krótkie uzasadnienie"
    }
  ]
}"#;

/// Response token budget for an address batch.
pub fn address_max_tokens(items: usize) -> u32 {
    2000 + 200 * items as u32
}

/// Response token budget for a contractor batch.
pub fn contractor_max_tokens(items: usize) -> u32 {
    1000 + 100 * items as u32
}

/// User prompt for an address batch: examples, items, schema.
pub fn address_prompt(items: &[AddressRequestItem]) -> String {
    let mut prompt = String::with_capacity(2048 + items.len() * 256);
    prompt.push_str(ADDRESS_EXAMPLES);
    let _ = write!(
        prompt,
        "\n\nNow extract from these {} transaction(s):\n",
        items.len()
    );

    for item in items {
        let _ = write!(
            prompt,
            "\nTransaction {}:\n  DESC-BASE: {}\n  DESC-OPT: {}\n  AMOUNT: {} PLN\n  DATE: {}\n",
            item.index,
            item.desc_base,
            item.desc_opt,
            item.amount,
            item.date.format("%d/%m/%Y"),
        );
        if let Some(hint) = &item.hint {
            let _ = writeln!(
                prompt,
                "  PATTERN HINT: building {}, apartment {}, tenant {} (confidence {})",
                hint.building_number.as_deref().unwrap_or("?"),
                hint.apartment_number.as_deref().unwrap_or("?"),
                hint.tenant_name.as_deref().unwrap_or("?"),
                hint.confidence,
            );
        }
        prompt.push_str("---");
    }

    prompt.push_str("\n\n");
    prompt.push_str(ADDRESS_SCHEMA);
    prompt
}

/// User prompt for a contractor batch with each item's shortlist.
pub fn contractor_prompt(items: &[ContractorRequestItem]) -> String {
    let mut prompt = String::with_capacity(512 + items.len() * 512);

    for item in items {
        let opt = if item.desc_opt.trim().is_empty() {
            "(brak)"
        } else {
            item.desc_opt.as_str()
        };
        let _ = write!(
            prompt,
            "\n=== Transakcja {} ===\nDESC-BASE: \"{}\"\nDESC-OPT: \"{}\"\n",
            item.index, item.desc_base, opt
        );

        if item.candidates.is_empty() {
            prompt.push_str("\nBrak kandydatów - zwróć null\n");
        } else {
            prompt.push_str("\nKandydaci:\n");
            for (i, candidate) in item.candidates.iter().enumerate() {
                let _ = writeln!(prompt, "  {}. ID:{} \"{}\"", i + 1, candidate.id, candidate.name);
            }
        }
    }

    prompt.push_str("\n\nZwróć JSON z polem results dla każdej transakcji.");
    prompt
}
