//! # Header Synonym Tables
//!
//! Spreadsheet exports name the same column differently depending on the
//! point-of-sale vendor and the language of the install. Each logical field
//! lists every header we have seen for it, already normalized (see
//! [`super::normalize_header`]).

/// Logical fields of a sales export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleField {
    Date,
    ProductId,
    ProductName,
    Quantity,
    UnitPrice,
    LineAmount,
    OrderRef,
    Supplier,
    Cashier,
    PaymentMethod,
}

/// Logical fields of a product catalog export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Id,
    Name,
    Category,
    PurchasePrice,
    SellPrice,
}

/// One logical column and the headers that may carry it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec<F: 'static> {
    pub field: F,
    /// Name used in error messages.
    pub label: &'static str,
    pub required: bool,
    pub synonyms: &'static [&'static str],
}

pub const SALE_COLUMNS: &[ColumnSpec<SaleField>] = &[
    ColumnSpec {
        field: SaleField::Date,
        label: "date",
        required: true,
        synonyms: &["date", "sale date", "date de vente", "jour", "date vente"],
    },
    ColumnSpec {
        field: SaleField::ProductId,
        label: "product id",
        required: true,
        synonyms: &[
            "product id", "id", "sku", "reference", "ref", "code", "product code",
            "id produit", "code produit", "reference produit", "ref produit", "code article",
        ],
    },
    ColumnSpec {
        field: SaleField::ProductName,
        label: "product name",
        required: true,
        synonyms: &[
            "product name", "product", "name", "item", "designation", "libelle",
            "nom", "nom produit", "produit", "article",
        ],
    },
    ColumnSpec {
        field: SaleField::Quantity,
        label: "quantity",
        required: true,
        synonyms: &["quantity", "qty", "qte", "quantite", "nb", "nombre"],
    },
    ColumnSpec {
        field: SaleField::UnitPrice,
        label: "unit price",
        required: false,
        synonyms: &[
            "unit price", "unit price incl", "price", "prix", "prix unitaire",
            "prix unitaire ttc", "pu ttc", "pu",
        ],
    },
    ColumnSpec {
        field: SaleField::LineAmount,
        label: "line amount",
        required: false,
        synonyms: &[
            "line amount", "amount", "total", "line total", "montant", "montant ttc",
            "total ttc", "montant ligne",
        ],
    },
    ColumnSpec {
        field: SaleField::OrderRef,
        label: "order reference",
        required: false,
        synonyms: &[
            "order ref", "order", "order id", "order number", "ticket", "receipt",
            "transaction", "commande", "numero commande", "n commande", "numero ticket",
            "n ticket",
        ],
    },
    ColumnSpec {
        field: SaleField::Supplier,
        label: "supplier",
        required: false,
        synonyms: &["supplier", "vendor", "brand", "fournisseur", "marque"],
    },
    ColumnSpec {
        field: SaleField::Cashier,
        label: "cashier",
        required: false,
        synonyms: &["cashier", "seller", "employee", "caissier", "vendeur", "employe"],
    },
    ColumnSpec {
        field: SaleField::PaymentMethod,
        label: "payment method",
        required: false,
        synonyms: &[
            "payment method", "payment", "tender", "moyen de paiement", "paiement",
            "mode de paiement", "reglement",
        ],
    },
];

pub const PRODUCT_COLUMNS: &[ColumnSpec<ProductField>] = &[
    ColumnSpec {
        field: ProductField::Id,
        label: "id",
        required: true,
        synonyms: &["id", "product id", "sku", "reference", "ref", "code", "code produit", "code article"],
    },
    ColumnSpec {
        field: ProductField::Name,
        label: "name",
        required: true,
        synonyms: &["name", "product name", "product", "designation", "libelle", "nom", "produit", "article"],
    },
    ColumnSpec {
        field: ProductField::Category,
        label: "category",
        required: false,
        synonyms: &["category", "family", "categorie", "famille", "rayon"],
    },
    ColumnSpec {
        field: ProductField::PurchasePrice,
        label: "purchase price",
        required: false,
        synonyms: &[
            "purchase price", "cost", "cost price", "buy price", "prix achat", "prix d achat",
            "prix achat ht", "pa ht", "cout",
        ],
    },
    ColumnSpec {
        field: ProductField::SellPrice,
        label: "sell price",
        required: false,
        synonyms: &[
            "sell price", "sale price", "price", "retail price", "prix vente", "prix de vente",
            "prix vente ttc", "pv ttc", "prix",
        ],
    },
];

/// Maps each field to the index of the first header that names it.
///
/// Returns `(resolved, unclaimed)` where `unclaimed` holds the indices of
/// headers no field took. A header is claimed by at most one field, in
/// table order.
pub fn resolve<F: Copy + Eq>(
    headers: &[String],
    columns: &[ColumnSpec<F>],
) -> (Vec<(F, usize)>, Vec<usize>) {
    let mut claimed = vec![false; headers.len()];
    let mut resolved = Vec::with_capacity(columns.len());

    for spec in columns {
        // Synonym order is the preference order
        let hit = spec.synonyms.iter().find_map(|synonym| {
            headers
                .iter()
                .enumerate()
                .find(|(idx, header)| !claimed[*idx] && header.as_str() == *synonym)
                .map(|(idx, _)| idx)
        });
        if let Some(idx) = hit {
            claimed[idx] = true;
            resolved.push((spec.field, idx));
        }
    }

    let unclaimed = claimed
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(idx, _)| idx)
        .collect();

    (resolved, unclaimed)
}

/// First required column that did not resolve.
pub fn first_missing<'a, F: Copy + Eq>(
    resolved: &[(F, usize)],
    columns: &'a [ColumnSpec<F>],
) -> Option<&'a ColumnSpec<F>> {
    columns
        .iter()
        .filter(|spec| spec.required)
        .find(|spec| !resolved.iter().any(|(field, _)| *field == spec.field))
}
