/// Column names of the liked-items sheet.
pub mod liked {
    pub const SHEET: &str = "Liked Models";

    pub const UID: &str = "Model UID";
    pub const NAME: &str = "Model Name";
    /// Older workbooks label the name column without the `Model` prefix.
    pub const NAME_ALIAS: &str = "Name";
    pub const AUTHOR: &str = "Author";
    pub const DESCRIPTION: &str = "Description";
    pub const TAGS: &str = "Tags";
    pub const MANUAL: &str = "Manual";
    pub const SUGGESTED: &str = "Suggested Collection(s)";
    pub const FUZZY: &str = "Fuzzy Match Collection(s)";
    pub const ASSIGNED: &str = "Assigned Collection(s)";
    pub const NOTES: &str = "Assignment Notes";
    pub const PUSH_SENT: &str = "Push Sent";
    pub const PUSHED_AT: &str = "Pushed At";

    /// Write order for the columns Curator owns.
    pub const ALL: &[&str] = &[
        UID,
        NAME,
        AUTHOR,
        DESCRIPTION,
        TAGS,
        MANUAL,
        SUGGESTED,
        FUZZY,
        ASSIGNED,
        NOTES,
        PUSH_SENT,
        PUSHED_AT,
    ];
}

/// Column names of the collections sheet.
pub mod collections {
    pub const SHEET: &str = "Collections";

    pub const NAME: &str = "Collection Name";
    pub const UID: &str = "Collection UID";
    pub const SLUG: &str = "Slug";
    pub const MODEL_COUNT: &str = "Model Count";
    pub const MODEL_UIDS: &str = "Model UIDs";

    pub const ALL: &[&str] = &[NAME, UID, SLUG, MODEL_COUNT, MODEL_UIDS];
}
