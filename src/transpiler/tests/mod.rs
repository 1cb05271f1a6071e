mod conditions;

use std::sync::Arc;

use crate::model::{ModelDef, Provider};

pub(super) fn opportunity() -> Arc<ModelDef> {
    Arc::new(
        ModelDef::builder("Opportunity", "Opportunity", Provider::Salesforce)
            .field("id", "Id")
            .field("name", "Name")
            .field("amount", "Amount")
            .field("createdDate", "CreatedDate")
            .build()
            .unwrap(),
    )
}

pub(super) fn opp_with_relations() -> Arc<ModelDef> {
    Arc::new(
        ModelDef::builder("Opp", "Opportunity", Provider::Salesforce)
            .field("ownerId", "OwnerId")
            .field("amount", "Amount")
            .field("accountName", "Account.Name")
            .build()
            .unwrap(),
    )
}
