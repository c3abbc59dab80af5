use crate::Database;
use crate::models::{AnnouncementRow, CategoryRow, ResponseRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

const RESPONSE_SELECT: &str = "SELECT r.id, r.announcement_id, a.title, a.user_id, \
     r.user_id, u.username, u.email, r.text, r.status, r.created_at
     FROM responses r
     JOIN announcements a ON r.announcement_id = a.id
     JOIN users u ON r.user_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, is_staff) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, email, password_hash, is_staff],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn email_taken(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1",
                [email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Store a fresh confirmation token, overwriting any prior one.
    pub fn set_confirmation_token(&self, user_id: &str, token: &str, issued_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET confirmation_token = ?2, token_issued_at = ?3 WHERE id = ?1",
                rusqlite::params![user_id, token, issued_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_token(&self, token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "confirmation_token = ?1", token))
    }

    /// Activate an account: flips `email_confirmed` and clears the token
    /// columns in a single UPDATE so no partial state is observable.
    pub fn confirm_user(&self, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET email_confirmed = 1, confirmation_token = NULL, token_issued_at = NULL
                 WHERE id = ?1",
                [user_id],
            )?;
            Ok(())
        })
    }

    // -- Categories --

    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CategoryRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn category_id_by_name(&self, name: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()
        })
    }

    // -- Announcements --

    pub fn insert_announcement(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        content: &str,
        category_id: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO announcements (id, user_id, title, content, category_id, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, title, content, category_id, image_url],
            )?;
            Ok(())
        })
    }

    pub fn get_announcement(&self, id: &str) -> Result<Option<AnnouncementRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ANNOUNCEMENT_SELECT} WHERE a.id = ?1"))?;
            stmt.query_row([id], map_announcement).optional()
        })
    }

    pub fn list_announcements(&self) -> Result<Vec<AnnouncementRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{ANNOUNCEMENT_SELECT} ORDER BY a.created_at DESC"))?;
            let rows = stmt
                .query_map([], map_announcement)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_announcement(
        &self,
        id: &str,
        title: &str,
        content: &str,
        category_id: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE announcements SET title = ?2, content = ?3, category_id = ?4, image_url = ?5
                 WHERE id = ?1",
                rusqlite::params![id, title, content, category_id, image_url],
            )?;
            Ok(n)
        })
    }

    /// Cascades to the announcement's responses via the FK.
    pub fn delete_announcement(&self, id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM announcements WHERE id = ?1", [id])?;
            Ok(n)
        })
    }

    // -- Responses --

    pub fn insert_response(
        &self,
        id: &str,
        announcement_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO responses (id, announcement_id, user_id, text) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, announcement_id, user_id, text],
            )?;
            Ok(())
        })
    }

    pub fn get_response(&self, id: &str) -> Result<Option<ResponseRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{RESPONSE_SELECT} WHERE r.id = ?1"))?;
            stmt.query_row([id], map_response).optional()
        })
    }

    pub fn set_response_status(&self, id: &str, status: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE responses SET status = ?2 WHERE id = ?1",
                rusqlite::params![id, status],
            )?;
            Ok(n)
        })
    }

    pub fn delete_response(&self, id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM responses WHERE id = ?1", [id])?;
            Ok(n)
        })
    }

    pub fn responses_for_announcement(&self, announcement_id: &str) -> Result<Vec<ResponseRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{RESPONSE_SELECT} WHERE r.announcement_id = ?1 ORDER BY r.created_at"
            ))?;
            let rows = stmt
                .query_map([announcement_id], map_response)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All responses to the given owner's announcements, optionally narrowed
    /// to one announcement or to one category name.
    pub fn responses_for_owner(
        &self,
        owner_id: &str,
        announcement_id: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<ResponseRow>> {
        self.with_conn(|conn| {
            let mut sql = format!("{RESPONSE_SELECT} WHERE a.user_id = ?1");
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&owner_id];

            if let Some(aid) = announcement_id.as_ref() {
                params.push(aid);
                sql.push_str(&format!(" AND r.announcement_id = ?{}", params.len()));
            }
            if let Some(cat) = category.as_ref() {
                params.push(cat);
                sql.push_str(&format!(
                    " AND a.category_id IN (SELECT id FROM categories WHERE name = ?{})",
                    params.len()
                ));
            }
            sql.push_str(" ORDER BY r.created_at DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_response)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Newsletter --

    /// Subscribe (or re-activate) / unsubscribe a user. One row per user.
    pub fn set_subscription(&self, user_id: &str, active: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO newsletter_subscribers (user_id, active) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET active = excluded.active",
                rusqlite::params![user_id, active],
            )?;
            Ok(())
        })
    }

    pub fn active_subscriber_emails(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.email FROM newsletter_subscribers s
                 JOIN users u ON s.user_id = u.id
                 WHERE s.active = 1
                 ORDER BY s.subscribed_at, u.email",
            )?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const ANNOUNCEMENT_SELECT: &str = "SELECT a.id, a.user_id, u.username, a.title, a.content, \
     c.name, a.image_url, a.created_at
     FROM announcements a
     JOIN users u ON a.user_id = u.id
     LEFT JOIN categories c ON a.category_id = c.id";

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, email, is_staff, email_confirmed, \
         confirmation_token, token_issued_at, created_at
         FROM users WHERE {predicate}"
    ))?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            email: row.get(3)?,
            is_staff: row.get(4)?,
            email_confirmed: row.get(5)?,
            confirmation_token: row.get(6)?,
            token_issued_at: row.get(7)?,
            created_at: row.get(8)?,
        })
    })
    .optional()
}

fn map_announcement(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnnouncementRow> {
    Ok(AnnouncementRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author_username: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        category: row.get(5)?,
        image_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResponseRow> {
    Ok(ResponseRow {
        id: row.get(0)?,
        announcement_id: row.get(1)?,
        announcement_title: row.get(2)?,
        announcement_owner_id: row.get(3)?,
        user_id: row.get(4)?,
        username: row.get(5)?,
        user_email: row.get(6)?,
        text: row.get(7)?,
        status: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use uuid::Uuid;

    fn new_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, &format!("{username}@guild.test"), "hash", false)
            .unwrap();
        id
    }

    fn new_announcement(db: &Database, user_id: &str, title: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_announcement(&id, user_id, title, "content", None, None)
            .unwrap();
        id
    }

    fn new_response(db: &Database, announcement_id: &str, user_id: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_response(&id, announcement_id, user_id, "I can tank")
            .unwrap();
        id
    }

    #[test]
    fn responses_default_to_pending() {
        let db = Database::open_in_memory().unwrap();
        let owner = new_user(&db, "alice");
        let responder = new_user(&db, "bob");
        let ann = new_announcement(&db, &owner, "Tank needed");
        let resp = new_response(&db, &ann, &responder);

        let row = db.get_response(&resp).unwrap().unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(row.announcement_owner_id, owner);
        assert_eq!(row.user_email, "bob@guild.test");
    }

    #[test]
    fn deleting_announcement_cascades_to_responses() {
        let db = Database::open_in_memory().unwrap();
        let owner = new_user(&db, "alice");
        let responder = new_user(&db, "bob");
        let ann = new_announcement(&db, &owner, "Tank needed");
        let r1 = new_response(&db, &ann, &responder);
        let r2 = new_response(&db, &ann, &responder);

        assert_eq!(db.delete_announcement(&ann).unwrap(), 1);
        assert!(db.get_response(&r1).unwrap().is_none());
        assert!(db.get_response(&r2).unwrap().is_none());
    }

    #[test]
    fn deleting_user_cascades_through_announcements() {
        let db = Database::open_in_memory().unwrap();
        let owner = new_user(&db, "alice");
        let responder = new_user(&db, "bob");
        let ann = new_announcement(&db, &owner, "Healer wanted");
        let resp = new_response(&db, &ann, &responder);

        db.with_conn_mut(|conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", [owner.as_str()])?;
            Ok(())
        })
        .unwrap();

        assert!(db.get_announcement(&ann).unwrap().is_none());
        assert!(db.get_response(&resp).unwrap().is_none());
    }

    #[test]
    fn deleting_category_nulls_announcement_reference() {
        let db = Database::open_in_memory().unwrap();
        let owner = new_user(&db, "alice");
        let cat = db.category_id_by_name("tank").unwrap().unwrap();

        let ann = Uuid::new_v4().to_string();
        db.insert_announcement(&ann, &owner, "Tank needed", "content", Some(&cat), None)
            .unwrap();

        db.with_conn_mut(|conn| {
            conn.execute("DELETE FROM categories WHERE id = ?1", [cat.as_str()])?;
            Ok(())
        })
        .unwrap();

        let row = db.get_announcement(&ann).unwrap().unwrap();
        assert_eq!(row.category, None);
    }

    #[test]
    fn confirm_user_clears_token_columns() {
        let db = Database::open_in_memory().unwrap();
        let user = new_user(&db, "carol");
        db.set_confirmation_token(&user, "tok123", "2026-01-01T00:00:00Z")
            .unwrap();

        let row = db.get_user_by_token("tok123").unwrap().unwrap();
        assert_eq!(row.id, user);

        db.confirm_user(&user).unwrap();

        assert!(db.get_user_by_token("tok123").unwrap().is_none());
        let row = db.get_user_by_id(&user).unwrap().unwrap();
        assert!(row.email_confirmed);
        assert_eq!(row.confirmation_token, None);
        assert_eq!(row.token_issued_at, None);
    }

    #[test]
    fn only_active_subscribers_are_collected() {
        let db = Database::open_in_memory().unwrap();
        let a = new_user(&db, "alice");
        let b = new_user(&db, "bob");
        let c = new_user(&db, "carol");

        db.set_subscription(&a, true).unwrap();
        db.set_subscription(&b, true).unwrap();
        db.set_subscription(&b, false).unwrap();
        db.set_subscription(&c, true).unwrap();

        let emails = db.active_subscriber_emails().unwrap();
        assert_eq!(emails, vec!["alice@guild.test", "carol@guild.test"]);
    }

    #[test]
    fn owner_response_listing_honours_filters() {
        let db = Database::open_in_memory().unwrap();
        let owner = new_user(&db, "alice");
        let responder = new_user(&db, "bob");
        let tank = db.category_id_by_name("tank").unwrap().unwrap();

        let a1 = Uuid::new_v4().to_string();
        db.insert_announcement(&a1, &owner, "Tank needed", "content", Some(&tank), None)
            .unwrap();
        let a2 = new_announcement(&db, &owner, "Healer wanted");

        new_response(&db, &a1, &responder);
        new_response(&db, &a2, &responder);

        assert_eq!(db.responses_for_owner(&owner, None, None).unwrap().len(), 2);
        assert_eq!(
            db.responses_for_owner(&owner, Some(&a1), None).unwrap().len(),
            1
        );
        let by_cat = db.responses_for_owner(&owner, None, Some("tank")).unwrap();
        assert_eq!(by_cat.len(), 1);
        assert_eq!(by_cat[0].announcement_title, "Tank needed");

        // Another user's announcements never show up
        assert!(db.responses_for_owner(&responder, None, None).unwrap().is_empty());
    }
}
