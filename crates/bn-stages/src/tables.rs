//! Vendor feeds and the tables every stage reads and writes

use bn_core::{Predicate, TableName};

/// Blob key prefix of raw vendor files
pub const INPUTS_PREFIX: &str = "data/inputs/";
/// Blob key prefix of cleaned, derived and report files
pub const OUTPUTS_PREFIX: &str = "data/outputs/";
/// Blob key prefix of archived step logs
pub const LOGS_PREFIX: &str = "logs/";

/// One vendor feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Erp,
    Web,
    Liaison,
}

impl Feed {
    pub const ALL: [Feed; 3] = [Feed::Erp, Feed::Web, Feed::Liaison];

    pub fn name(self) -> &'static str {
        match self {
            Feed::Erp => "erp",
            Feed::Web => "web",
            Feed::Liaison => "liaison",
        }
    }

    /// Label used in the final report
    pub fn label(self) -> &'static str {
        match self {
            Feed::Erp => "ERP",
            Feed::Web => "Web",
            Feed::Liaison => "Liaison",
        }
    }

    /// Raw file name inside the inputs directory
    pub fn file_name(self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn raw_table(self) -> TableName {
        TableName::new(self.name())
    }

    pub fn clean_table(self) -> TableName {
        TableName::new(format!("{}_clean", self.name()))
    }

    pub fn dedup_table(self) -> TableName {
        TableName::new(format!("{}_dedup", self.name()))
    }

    /// Business key identifying one entity after deduplication
    pub fn key(self) -> &'static str {
        match self {
            Feed::Erp | Feed::Liaison => "product_id",
            Feed::Web => "sku",
        }
    }

    /// Validity rule a raw row must satisfy to survive cleaning
    pub fn clean_rule(self) -> Predicate {
        match self {
            Feed::Erp => Predicate::all_not_null(&[
                "product_id",
                "onsale_web",
                "price",
                "stock_quantity",
                "stock_status",
            ])
            .and(Predicate::gt("price", 0)),
            Feed::Web => Predicate::all_not_null(&["sku"]),
            Feed::Liaison => Predicate::all_not_null(&["product_id", "id_web"]),
        }
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub fn resume_stats() -> TableName {
    TableName::new("resume_stats")
}

pub fn fusion() -> TableName {
    TableName::new("fusion")
}

pub fn revenue_per_product() -> TableName {
    TableName::new("ca_par_produit")
}

pub fn revenue_total() -> TableName {
    TableName::new("ca_total")
}

pub fn zscore() -> TableName {
    TableName::new("zscore_prix")
}

pub fn vintage() -> TableName {
    TableName::new("vins_millesimes")
}

pub fn ordinary() -> TableName {
    TableName::new("vins_ordinaires")
}

pub fn report() -> TableName {
    TableName::new("rapport_final")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_tables() {
        assert_eq!(Feed::Erp.clean_table().as_str(), "erp_clean");
        assert_eq!(Feed::Web.dedup_table().as_str(), "web_dedup");
        assert_eq!(Feed::Liaison.file_name(), "liaison.csv");
        assert_eq!(Feed::Web.key(), "sku");
    }

    #[test]
    fn test_erp_rule_requires_positive_price() {
        let Predicate::And(parts) = Feed::Erp.clean_rule() else {
            panic!("erp rule should be a conjunction");
        };
        assert!(parts.contains(&Predicate::gt("price", 0)));
    }
}
