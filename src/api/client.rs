//! API client
//!
//! Domain operations over a shared [`SessionManager`]. Clones share the same
//! session, and the mutex around it keeps calls strictly one at a time.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::info;

use super::folders::{decorate_lists, ListEntry};
use super::types::{ExportFormat, ExportKind, ListType, RawExportTarget};
use crate::config::ClientConfig;
use crate::datetime::format_range_bound;
use crate::error::{Result, SilverError};
use crate::job::ExportJob;
use crate::rpc::{collection, Params, RpcChannel, SoapChannel};
use crate::session::{Credentials, SessionManager};

pub struct SilverClient<C: RpcChannel = SoapChannel> {
    session: Arc<Mutex<SessionManager<C>>>,
    timezone: Tz,
}

impl<C: RpcChannel> Clone for SilverClient<C> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            timezone: self.timezone,
        }
    }
}

impl SilverClient<SoapChannel> {
    /// Connect to the configured pod and log in
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let channel = SoapChannel::with_endpoint(&config.api_endpoint(), config.request_timeout())?;
        info!("Connecting to {}", channel.endpoint());
        Self::with_channel(channel, config.credentials()?, config.timezone()?).await
    }
}

impl<C: RpcChannel> SilverClient<C> {
    /// Build a client over `channel` and log in.
    ///
    /// A rejected login fails construction with [`SilverError::Authentication`].
    pub async fn with_channel(channel: C, credentials: Credentials, timezone: Tz) -> Result<Self> {
        let mut session = SessionManager::new(channel, credentials);
        session.login().await?;
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            timezone,
        })
    }

    /// Timezone used for parsing timestamps and defaulting range bounds
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Issue a raw call through the session
    pub async fn call(&self, method: &str, params: Params) -> Result<Value> {
        self.session.lock().await.call(method, params).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_authenticated()
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.lock().await.logout().await
    }

    /// Mailings sent to a list between `start` and `end` (default: now)
    pub async fn list_mailings_for_list(
        &self,
        list_id: &str,
        start: &DateTime<Tz>,
        end: Option<&DateTime<Tz>>,
    ) -> Result<Vec<Value>> {
        let end = match end {
            Some(end) => *end,
            None => Utc::now().with_timezone(&self.timezone),
        };

        let mut params = Params::new();
        params.insert("LIST_ID".into(), json!(list_id));
        params.insert("DATE_START".into(), json!(format_range_bound(start)));
        params.insert("DATE_END".into(), json!(format_range_bound(&end)));
        params.insert("INCLUDE_CHILDREN".into(), json!(1));

        let payload = self.call("GetSentMailingsForList", params).await?;
        Ok(collection(payload.get("Mailing")))
    }

    /// Leaf lists of a category, decorated with folder paths
    pub async fn list_folders(&self, list_type: ListType) -> Result<Vec<ListEntry>> {
        let mut params = Params::new();
        params.insert("VISIBILITY".into(), json!(1));
        params.insert("INCLUDE_ALL_LISTS".into(), json!(true));
        params.insert("LIST_TYPE".into(), json!(list_type.0));

        let payload = self.call("GetLists", params).await?;
        decorate_lists(collection(payload.get("LIST")), self.timezone)
    }

    pub async fn contact_lists(&self) -> Result<Vec<ListEntry>> {
        self.list_folders(ListType::CONTACT_LISTS).await
    }

    /// Submit a CSV `ExportList` job
    pub async fn submit_export(
        &self,
        list_id: &str,
        start: Option<&DateTime<Tz>>,
        end: Option<&DateTime<Tz>>,
        kind: ExportKind,
    ) -> Result<ExportJob<C>> {
        self.submit_export_as(list_id, start, end, kind, ExportFormat::default())
            .await
    }

    pub async fn submit_export_as(
        &self,
        list_id: &str,
        start: Option<&DateTime<Tz>>,
        end: Option<&DateTime<Tz>>,
        kind: ExportKind,
        format: ExportFormat,
    ) -> Result<ExportJob<C>> {
        let mut params = Params::new();
        params.insert("LIST_ID".into(), json!(list_id));
        params.insert("EXPORT_TYPE".into(), json!(kind.as_str()));
        params.insert("EXPORT_FORMAT".into(), json!(format.as_str()));
        insert_bounds(&mut params, start, end);

        let payload = self.call("ExportList", params).await?;
        ExportJob::from_submission(self.clone(), "ExportList", payload)
    }

    /// Export every contact of a list
    pub async fn export_list(&self, list_id: &str) -> Result<ExportJob<C>> {
        self.submit_export(list_id, None, None, ExportKind::All).await
    }

    /// Submit a raw recipient-event export delivered to the file drop
    pub async fn submit_raw_event_export(
        &self,
        target: &RawExportTarget,
        start: Option<&DateTime<Tz>>,
        end: Option<&DateTime<Tz>>,
    ) -> Result<ExportJob<C>> {
        let (key, id) = target.param();
        let mut params = Params::new();
        params.insert(key.into(), json!(id));
        params.insert("MOVE_TO_FTP".into(), json!(1));
        insert_bounds(&mut params, start, end);

        let payload = self.call("RawRecipientDataExport", params).await?;
        let submission = collection(payload.get("MAILING"))
            .into_iter()
            .next()
            .ok_or_else(|| {
                SilverError::InvalidResponse(
                    "RawRecipientDataExport response carried no MAILING".to_string(),
                )
            })?;
        ExportJob::from_submission(self.clone(), "RawRecipientDataExport", submission)
    }

    pub async fn export_raw_list_events(&self, list_id: &str) -> Result<ExportJob<C>> {
        self.submit_raw_event_export(&RawExportTarget::List(list_id.to_string()), None, None)
            .await
    }

    pub async fn export_raw_mailing_events(&self, mailing_id: &str) -> Result<ExportJob<C>> {
        self.submit_raw_event_export(&RawExportTarget::Mailing(mailing_id.to_string()), None, None)
            .await
    }

    /// Current status payload of a job
    pub async fn job_status(&self, job_id: &str) -> Result<Value> {
        let mut params = Params::new();
        params.insert("JOB_ID".into(), json!(job_id));
        self.call("GetJobStatus", params).await
    }
}

fn insert_bounds(params: &mut Params, start: Option<&DateTime<Tz>>, end: Option<&DateTime<Tz>>) {
    if let Some(start) = start {
        params.insert("DATE_START".into(), json!(format_range_bound(start)));
    }
    if let Some(end) = end {
        params.insert("DATE_END".into(), json!(format_range_bound(end)));
    }
}

impl<C: RpcChannel> fmt::Debug for SilverClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SilverClient")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::ScriptedChannel;
    use chrono::TimeZone;
    use secrecy::SecretString;

    const NY: Tz = chrono_tz::America::New_York;

    fn credentials() -> Credentials {
        Credentials::new("api@example.com", SecretString::new("secret".into()))
    }

    async fn client(channel: &ScriptedChannel) -> SilverClient<ScriptedChannel> {
        SilverClient::with_channel(channel.clone(), credentials(), NY)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_construction_logs_in_once() {
        let channel = ScriptedChannel::new();
        let client = client(&channel).await;

        client.job_status("1").await.unwrap();
        client.job_status("2").await.unwrap();

        assert!(client.is_authenticated().await);
        assert_eq!(channel.login_count(), 1);
        assert!(channel
            .api_calls()
            .iter()
            .all(|c| c.session.as_deref() == Some("token-1")));
    }

    #[tokio::test]
    async fn test_rejected_login_fails_construction() {
        let channel = ScriptedChannel::new();
        channel.reject_logins();

        let result = SilverClient::with_channel(channel.clone(), credentials(), NY).await;
        assert!(matches!(result, Err(SilverError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_clones_share_the_session() {
        let channel = ScriptedChannel::new();
        channel.push_expired();
        let client = client(&channel).await;
        let other = client.clone();

        client.job_status("1").await.unwrap();
        other.job_status("2").await.unwrap();

        let calls = channel.api_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].session.as_deref(), Some("token-2"));
        assert_eq!(channel.login_count(), 2);
    }

    #[tokio::test]
    async fn test_list_mailings_formats_bounds() {
        let channel = ScriptedChannel::new();
        channel.push_ok(json!({
            "SUCCESS": "TRUE",
            "Mailing": {"MailingId": "900", "MailingName": "Welcome"}
        }));
        let client = client(&channel).await;

        let start = NY.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let end = NY.with_ymd_and_hms(2018, 1, 31, 23, 59, 59).unwrap();
        let mailings = client
            .list_mailings_for_list("55", &start, Some(&end))
            .await
            .unwrap();

        assert_eq!(mailings.len(), 1);
        assert_eq!(mailings[0]["MailingId"], json!("900"));

        let call = &channel.api_calls()[0];
        assert_eq!(call.method, "GetSentMailingsForList");
        assert_eq!(call.params["LIST_ID"], json!("55"));
        assert_eq!(call.params["DATE_START"], json!("01/01/2018 00:00:00"));
        assert_eq!(call.params["DATE_END"], json!("01/31/2018 23:59:59"));
        assert_eq!(call.params["INCLUDE_CHILDREN"], json!(1));
    }

    #[tokio::test]
    async fn test_list_mailings_defaults_end_to_now() {
        let channel = ScriptedChannel::new();
        let client = client(&channel).await;

        let start = NY.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let mailings = client.list_mailings_for_list("55", &start, None).await.unwrap();
        assert!(mailings.is_empty());

        let call = &channel.api_calls()[0];
        let end = call.params["DATE_END"].as_str().unwrap();
        let year = Utc::now().with_timezone(&NY).format("%Y").to_string();
        assert_eq!(&end[6..10], year);
    }

    #[tokio::test]
    async fn test_list_folders_decorates_leaves() {
        let channel = ScriptedChannel::new();
        channel.push_ok(json!({
            "SUCCESS": "TRUE",
            "LIST": [
                {"ID": "1", "NAME": "Root", "IS_FOLDER": "true"},
                {"ID": "2", "NAME": "Sub", "IS_FOLDER": "true", "PARENT_FOLDER_ID": "1"},
                {"ID": "30", "NAME": "Members", "TYPE": "18", "IS_FOLDER": "false",
                 "PARENT_FOLDER_ID": "2", "LAST_MODIFIED": "01/15/0018 07:00 PM"}
            ]
        }));
        let client = client(&channel).await;

        let lists = client.contact_lists().await.unwrap();

        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].folder_path, vec!["Root", "Sub"]);
        assert_eq!(
            lists[0].last_modified,
            Some(NY.with_ymd_and_hms(2018, 1, 15, 19, 0, 0).unwrap())
        );

        let call = &channel.api_calls()[0];
        assert_eq!(call.method, "GetLists");
        assert_eq!(call.params["LIST_TYPE"], json!(18));
        assert_eq!(call.params["INCLUDE_ALL_LISTS"], json!(true));
    }

    #[tokio::test]
    async fn test_submit_export_only_sends_given_bounds() {
        let channel = ScriptedChannel::new();
        channel.push_ok(json!({"SUCCESS": "TRUE", "JOB_ID": "77", "FILE_PATH": "list.csv"}));
        let client = client(&channel).await;

        let start = NY.with_ymd_and_hms(2018, 2, 1, 8, 0, 0).unwrap();
        let job = client
            .submit_export("55", Some(&start), None, ExportKind::OptOut)
            .await
            .unwrap();

        assert_eq!(job.job_id(), "77");
        let call = &channel.api_calls()[0];
        assert_eq!(call.method, "ExportList");
        assert_eq!(call.params["EXPORT_TYPE"], json!("OPT_OUT"));
        assert_eq!(call.params["EXPORT_FORMAT"], json!("CSV"));
        assert_eq!(call.params["DATE_START"], json!("02/01/2018 08:00:00"));
        assert!(!call.params.contains_key("DATE_END"));
    }

    #[tokio::test]
    async fn test_export_list_defaults() {
        let channel = ScriptedChannel::new();
        channel.push_ok(json!({"SUCCESS": "TRUE", "JOB_ID": "78"}));
        let client = client(&channel).await;

        client.export_list("55").await.unwrap();

        let params = &channel.api_calls()[0].params;
        assert_eq!(params["EXPORT_TYPE"], json!("ALL"));
        assert!(!params.contains_key("DATE_START"));
    }

    #[tokio::test]
    async fn test_raw_event_export_requests_file_drop() {
        let channel = ScriptedChannel::new();
        channel.push_ok(json!({
            "SUCCESS": "TRUE",
            "MAILING": {"JOB_ID": "88", "FILE_PATH": "raw_events.zip"}
        }));
        let client = client(&channel).await;

        let job = client.export_raw_mailing_events("900").await.unwrap();

        assert_eq!(job.job_id(), "88");
        assert_eq!(job.submission()["FILE_PATH"], json!("raw_events.zip"));
        let call = &channel.api_calls()[0];
        assert_eq!(call.method, "RawRecipientDataExport");
        assert_eq!(call.params["MAILING_ID"], json!("900"));
        assert_eq!(call.params["MOVE_TO_FTP"], json!(1));
        assert!(!call.params.contains_key("LIST_ID"));
    }

    #[tokio::test]
    async fn test_raw_event_export_without_mailing_is_invalid() {
        let channel = ScriptedChannel::new();
        channel.push_ok(json!({"SUCCESS": "TRUE"}));
        let client = client(&channel).await;

        let err = client.export_raw_list_events("55").await.unwrap_err();
        assert!(matches!(err, SilverError::InvalidResponse(_)));
        assert_eq!(channel.api_calls()[0].params["LIST_ID"], json!("55"));
    }

    #[tokio::test]
    async fn test_logout() {
        let channel = ScriptedChannel::new();
        let client = client(&channel).await;

        client.logout().await.unwrap();
        assert!(!client.is_authenticated().await);
    }
}
