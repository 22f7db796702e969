//! Instruction template for the text-generation service.

/// Shape of the JSON object the model is asked to return.
///
/// Field names match [`StructuredReceipt`](crate::models::receipt::StructuredReceipt)
/// minus `raw_text` and `extraction_method`, which the pipeline fills in.
pub const RESPONSE_SCHEMA: &str = r#"{
  "merchant_name": "string - name of the store or restaurant, or empty string",
  "purchased_at": "string - date and time in ISO format (YYYY-MM-DDTHH:MM:SS), or null",
  "total_amount": "number - grand total, or null",
  "subtotal": "number - subtotal before tax and tip, or null",
  "tax_amount": "number - tax amount, or null",
  "tip_amount": "number - tip or gratuity, or null",
  "payment_method": "string - payment method (CASH, CREDIT, DEBIT, VISA, ...), or empty string",
  "receipt_number": "string - receipt or transaction number, or empty string",
  "cashier": "string - cashier or server name, or empty string",
  "items": [
    {
      "item_name": "string - item description",
      "quantity": "number - quantity (default 1)",
      "unit_price": "number - price per unit, or null",
      "total_price": "number - line total, or null"
    }
  ]
}"#;

const GUIDELINES: &[&str] = &[
    "Extract ALL purchased items, not a sample.",
    "Write amounts as plain numbers without currency symbols or thousands separators.",
    "Convert dates to ISO format.",
    "Use null for missing numbers and an empty string for missing text.",
    "Double-check decimal values; never guess digits.",
    "Look for receipt markers such as QTY, PRICE, SUBTOTAL, TAX and TOTAL.",
    "Write payment methods in uppercase (CASH, CREDIT, DEBIT, VISA, MASTERCARD).",
];

/// Build the full instruction for one receipt.
pub fn build_prompt(raw_text: &str) -> String {
    let guidelines = GUIDELINES
        .iter()
        .map(|g| format!("- {}", g))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert receipt parser. Analyze the receipt text below and extract structured information.\n\
         Return ONLY a valid JSON object with this structure, without any other text or formatting:\n\
         {schema}\n\n\
         Guidelines:\n\
         {guidelines}\n\n\
         Receipt text:\n\
         {raw_text}\n",
        schema = RESPONSE_SCHEMA,
        guidelines = guidelines,
        raw_text = raw_text,
    )
}
