use crate::config::SavedRoots;
use crate::gateway::{FetchError, PushEvent, QueryError};
use crate::item::{ItemDetails, ItemId};
use crate::repo::FileRepo;
use crate::results::{QueryRequest, QueryResponse, ResultListController};
use crate::viewport;
use eframe::egui;
use notify::Watcher as _;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const ROW_HEIGHT: f32 = 22.0;
const PRELOAD_ROWS: f32 = 3.0;
const QUERY_DEBOUNCE: Duration = Duration::from_millis(300);

// Query input is debounced at the input boundary; the controller only ever
// sees settled text.
struct QueryDebouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl QueryDebouncer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    // True once per touched edit, after the quiet period has elapsed.
    fn fire(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

struct DetailsResponse {
    id: ItemId,
    result: Result<ItemDetails, FetchError>,
}

struct TagEditRequest {
    ids: Vec<ItemId>,
    tags: Vec<String>,
    insert: bool,
}

struct TagEditResponse {
    result: Result<Vec<PushEvent>, String>,
}

enum ScanRequest {
    Open(PathBuf),
    Close,
    Resync,
    Reload,
}

enum ScanResponse {
    Opened { path: PathBuf, items: usize },
    Closed,
    Synced { events: Vec<PushEvent> },
    Failed { error: String },
}

enum WatchRequest {
    Watch(PathBuf),
    Stop,
}

type SharedRepo = Arc<Mutex<Option<FileRepo>>>;

fn spawn_query_worker(repo: SharedRepo) -> (Sender<QueryRequest>, Receiver<QueryResponse>) {
    let (tx_req, rx_req) = mpsc::channel::<QueryRequest>();
    let (tx_res, rx_res) = mpsc::channel::<QueryResponse>();

    thread::spawn(move || {
        while let Ok(mut req) = rx_req.recv() {
            // Only the newest query matters; older ones are already
            // superseded on the controller side.
            while let Ok(newer) = rx_req.try_recv() {
                req = newer;
            }
            let result = {
                let guard = repo.lock().expect("repo lock poisoned");
                match guard.as_ref() {
                    Some(repo) if repo.root() == req.path => repo.query_ids(&req.text),
                    Some(_) | None => {
                        Err(QueryError::Unavailable("repository not open".to_string()))
                    }
                }
            };
            if tx_res
                .send(QueryResponse {
                    request_id: req.request_id,
                    result,
                })
                .is_err()
            {
                break;
            }
        }
    });

    (tx_req, rx_res)
}

fn spawn_details_worker(repo: SharedRepo) -> (Sender<ItemId>, Receiver<DetailsResponse>) {
    let (tx_req, rx_req) = mpsc::channel::<ItemId>();
    let (tx_res, rx_res) = mpsc::channel::<DetailsResponse>();

    thread::spawn(move || {
        while let Ok(id) = rx_req.recv() {
            let result = {
                let guard = repo.lock().expect("repo lock poisoned");
                match guard.as_ref() {
                    Some(repo) => repo.item_details(id),
                    None => Err(FetchError::Unavailable("repository not open".to_string())),
                }
            };
            if tx_res.send(DetailsResponse { id, result }).is_err() {
                break;
            }
        }
    });

    (tx_req, rx_res)
}

fn spawn_tag_worker(repo: SharedRepo) -> (Sender<TagEditRequest>, Receiver<TagEditResponse>) {
    let (tx_req, rx_req) = mpsc::channel::<TagEditRequest>();
    let (tx_res, rx_res) = mpsc::channel::<TagEditResponse>();

    thread::spawn(move || {
        while let Ok(req) = rx_req.recv() {
            let result = {
                let mut guard = repo.lock().expect("repo lock poisoned");
                match guard.as_mut() {
                    Some(repo) => {
                        let outcome = if req.insert {
                            repo.insert_tags(&req.ids, &req.tags)
                        } else {
                            repo.remove_tags(&req.ids, &req.tags)
                        };
                        outcome.map_err(|e| e.to_string())
                    }
                    None => Err("repository not open".to_string()),
                }
            };
            if tx_res.send(TagEditResponse { result }).is_err() {
                break;
            }
        }
    });

    (tx_req, rx_res)
}

fn handle_scan_request(repo: &SharedRepo, req: ScanRequest) -> ScanResponse {
    match req {
        ScanRequest::Open(path) => match FileRepo::open(&path) {
            Ok(opened) => {
                let items = opened.len();
                let path = opened.root().to_path_buf();
                *repo.lock().expect("repo lock poisoned") = Some(opened);
                ScanResponse::Opened { path, items }
            }
            Err(err) => ScanResponse::Failed {
                error: err.to_string(),
            },
        },
        ScanRequest::Close => {
            *repo.lock().expect("repo lock poisoned") = None;
            ScanResponse::Closed
        }
        ScanRequest::Resync => {
            let mut guard = repo.lock().expect("repo lock poisoned");
            match guard.as_mut() {
                Some(repo) => ScanResponse::Synced {
                    events: repo.resync(),
                },
                None => ScanResponse::Failed {
                    error: "repository not open".to_string(),
                },
            }
        }
        ScanRequest::Reload => {
            let mut guard = repo.lock().expect("repo lock poisoned");
            match guard.as_mut() {
                Some(repo) => match repo.reload() {
                    Ok(event) => ScanResponse::Synced {
                        events: vec![event],
                    },
                    Err(err) => ScanResponse::Failed {
                        error: err.to_string(),
                    },
                },
                None => ScanResponse::Failed {
                    error: "repository not open".to_string(),
                },
            }
        }
    }
}

// Open/Close/Resync/Reload are commands, not interchangeable lookups: every
// queued request runs, in order. Dropping an older one in favor of a newer
// one would lose the command entirely.
fn spawn_scan_worker(repo: SharedRepo) -> (Sender<ScanRequest>, Receiver<ScanResponse>) {
    let (tx_req, rx_req) = mpsc::channel::<ScanRequest>();
    let (tx_res, rx_res) = mpsc::channel::<ScanResponse>();

    thread::spawn(move || {
        while let Ok(req) = rx_req.recv() {
            if tx_res.send(handle_scan_request(&repo, req)).is_err() {
                break;
            }
        }
    });

    (tx_req, rx_res)
}

const WATCH_SETTLE: Duration = Duration::from_millis(200);

fn watch_event_is_relevant(event: &notify::Event) -> bool {
    use notify::EventKind;
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    // Dot-entries are outside the repository's view; the tag store writing
    // itself must not trigger a rescan loop.
    event.paths.iter().any(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| !name.starts_with('.'))
            .unwrap_or(true)
    })
}

// Recursive filesystem watcher over the open repository root. Bursts of
// change notifications are allowed to settle, then folded into one resync
// whose diff events are pushed to the UI thread.
fn spawn_watch_worker(repo: SharedRepo) -> (Sender<WatchRequest>, Receiver<Vec<PushEvent>>) {
    let (tx_req, rx_req) = mpsc::channel::<WatchRequest>();
    let (tx_res, rx_res) = mpsc::channel::<Vec<PushEvent>>();

    thread::spawn(move || {
        let (fs_tx, fs_rx) = mpsc::channel::<notify::Result<notify::Event>>();
        let mut watcher = match notify::RecommendedWatcher::new(
            move |res| {
                let _ = fs_tx.send(res);
            },
            notify::Config::default(),
        ) {
            Ok(watcher) => watcher,
            Err(err) => {
                warn!(%err, "filesystem watcher unavailable; changes need a manual resync");
                return;
            }
        };
        let mut watched: Option<PathBuf> = None;

        loop {
            match rx_req.try_recv() {
                Ok(WatchRequest::Watch(path)) => {
                    if let Some(old) = watched.take() {
                        let _ = watcher.unwatch(&old);
                    }
                    match watcher.watch(&path, notify::RecursiveMode::Recursive) {
                        Ok(()) => watched = Some(path),
                        Err(err) => {
                            warn!(%err, path = %path.display(), "cannot watch repository root");
                        }
                    }
                    // Events from the previous root are no longer wanted.
                    while fs_rx.try_recv().is_ok() {}
                }
                Ok(WatchRequest::Stop) => {
                    if let Some(old) = watched.take() {
                        let _ = watcher.unwatch(&old);
                    }
                }
                Err(mpsc::TryRecvError::Empty) => {}
                Err(mpsc::TryRecvError::Disconnected) => break,
            }

            let event = match fs_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(event)) => event,
                Ok(Err(_)) | Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            };
            if watched.is_none() || !watch_event_is_relevant(&event) {
                continue;
            }

            // Fold the burst: one settle window, one rescan.
            thread::sleep(WATCH_SETTLE);
            while fs_rx.try_recv().is_ok() {}

            let events = {
                let mut guard = repo.lock().expect("repo lock poisoned");
                match guard.as_mut() {
                    Some(repo) => repo.resync(),
                    None => Vec::new(),
                }
            };
            if !events.is_empty() && tx_res.send(events).is_err() {
                break;
            }
        }
    });

    (tx_req, rx_res)
}

pub struct TagViewApp {
    controller: ResultListController,
    saved_roots: SavedRoots,
    root_input: String,
    query_input: String,
    tag_input: String,
    debouncer: QueryDebouncer,
    notice: String,
    status_line: String,
    query_tx: Sender<QueryRequest>,
    query_rx: Receiver<QueryResponse>,
    details_tx: Sender<ItemId>,
    details_rx: Receiver<DetailsResponse>,
    tag_tx: Sender<TagEditRequest>,
    tag_rx: Receiver<TagEditResponse>,
    scan_tx: Sender<ScanRequest>,
    scan_rx: Receiver<ScanResponse>,
    watch_tx: Sender<WatchRequest>,
    watch_rx: Receiver<Vec<PushEvent>>,
    outstanding_scans: usize,
}

impl TagViewApp {
    pub fn new(root: Option<PathBuf>, query: String) -> Self {
        let repo: SharedRepo = Arc::new(Mutex::new(None));
        let (query_tx, query_rx) = spawn_query_worker(Arc::clone(&repo));
        let (details_tx, details_rx) = spawn_details_worker(Arc::clone(&repo));
        let (tag_tx, tag_rx) = spawn_tag_worker(Arc::clone(&repo));
        let (scan_tx, scan_rx) = spawn_scan_worker(Arc::clone(&repo));
        let (watch_tx, watch_rx) = spawn_watch_worker(repo);

        let mut app = Self {
            controller: ResultListController::new(),
            saved_roots: SavedRoots::load(),
            root_input: root
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            query_input: query,
            tag_input: String::new(),
            debouncer: QueryDebouncer::new(QUERY_DEBOUNCE),
            notice: String::new(),
            status_line: "No repository open".to_string(),
            query_tx,
            query_rx,
            details_tx,
            details_rx,
            tag_tx,
            tag_rx,
            scan_tx,
            scan_rx,
            watch_tx,
            watch_rx,
            outstanding_scans: 0,
        };
        if let Some(root) = root {
            app.request_open(root);
        }
        app
    }

    fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = notice.into();
        self.refresh_status_line();
    }

    fn refresh_status_line(&mut self) {
        let mut parts = vec![format!("Results: {}", self.controller.items().len())];
        let selected = self.controller.selection.len();
        if selected > 0 {
            parts.push(format!("Selected: {selected}"));
        }
        if self.controller.query_in_flight() || self.debouncer.pending() {
            parts.push("Searching...".to_string());
        }
        if self.outstanding_scans > 0 {
            parts.push("Scanning...".to_string());
        }
        if self.controller.invalid_query() {
            parts.push("Invalid query".to_string());
        }
        if !self.notice.is_empty() {
            parts.push(self.notice.clone());
        }
        self.status_line = parts.join(" | ");
    }

    fn send_query_request(&mut self, request: Option<QueryRequest>) {
        if let Some(request) = request {
            if self.query_tx.send(request).is_err() {
                self.set_notice("Query worker is unavailable");
            }
        }
        self.refresh_status_line();
    }

    fn send_scan_request(&mut self, request: ScanRequest) {
        if self.scan_tx.send(request).is_ok() {
            self.outstanding_scans += 1;
        } else {
            self.set_notice("Scan worker is unavailable");
        }
        self.refresh_status_line();
    }

    fn request_open(&mut self, path: PathBuf) {
        self.send_scan_request(ScanRequest::Open(path));
    }

    fn request_close(&mut self) {
        self.send_scan_request(ScanRequest::Close);
        let request = self.controller.set_repository_path(None);
        debug_assert!(request.is_none());
        self.refresh_status_line();
    }

    fn request_resync(&mut self) {
        self.send_scan_request(ScanRequest::Resync);
    }

    fn request_reload(&mut self) {
        self.send_scan_request(ScanRequest::Reload);
    }

    fn poll_query_responses(&mut self) {
        while let Ok(response) = self.query_rx.try_recv() {
            self.controller.apply_query_response(response);
        }
        self.refresh_status_line();
    }

    fn poll_details_responses(&mut self) {
        while let Ok(response) = self.details_rx.try_recv() {
            // A fetch that outlived a structural clear is stale; drop it.
            if !self.controller.cache.is_pending(response.id) {
                debug!(id = %response.id, "dropping stale detail fetch");
                continue;
            }
            match response.result {
                Ok(details) => self.controller.cache.insert(response.id, details),
                Err(err) => {
                    self.controller.cache.fetch_failed(response.id);
                    debug!(id = %response.id, %err, "detail fetch failed");
                }
            }
        }
    }

    fn poll_tag_responses(&mut self) {
        while let Ok(response) = self.tag_rx.try_recv() {
            match response.result {
                Ok(events) => {
                    for event in events {
                        let request = self.controller.apply_push_event(event);
                        self.send_query_request(request);
                    }
                }
                Err(error) => self.set_notice(format!("Tag edit failed: {error}")),
            }
        }
    }

    fn poll_scan_responses(&mut self) {
        while let Ok(response) = self.scan_rx.try_recv() {
            self.outstanding_scans = self.outstanding_scans.saturating_sub(1);
            match response {
                ScanResponse::Opened { path, items } => {
                    self.root_input = path.to_string_lossy().to_string();
                    self.notice.clear();
                    self.set_notice(format!("Opened repository ({items} items)"));
                    if self.watch_tx.send(WatchRequest::Watch(path.clone())).is_err() {
                        warn!("watch worker is gone; changes need a manual resync");
                    }
                    let request = self
                        .controller
                        .apply_push_event(PushEvent::RepositoryPathChanged(path));
                    self.send_query_request(request);
                }
                ScanResponse::Closed => {
                    let _ = self.watch_tx.send(WatchRequest::Stop);
                    self.set_notice("Repository closed");
                }
                ScanResponse::Synced { events } => {
                    self.notice.clear();
                    for event in events {
                        let request = self.controller.apply_push_event(event);
                        self.send_query_request(request);
                    }
                }
                ScanResponse::Failed { error } => {
                    self.set_notice(error);
                }
            }
        }
        self.refresh_status_line();
    }

    fn poll_watch_responses(&mut self) {
        while let Ok(events) = self.watch_rx.try_recv() {
            for event in events {
                let request = self.controller.apply_push_event(event);
                self.send_query_request(request);
            }
        }
    }

    // Plain click isolates, ctrl toggles, shift re-anchors a range,
    // ctrl+shift extends and merges.
    fn handle_row_click(&mut self, position: usize, modifiers: egui::Modifiers) {
        let selection = &mut self.controller.selection;
        if modifiers.command && modifiers.shift {
            selection.add_to(position);
        } else if modifiers.shift {
            selection.extend_to(position);
        } else if modifiers.command {
            if selection.contains(position) {
                selection.remove(position);
            } else {
                selection.add(position);
            }
        } else {
            selection.isolate(position);
        }
        self.refresh_status_line();
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let len = self.controller.items().len();
        let (down, up, shift, select_all, escape) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::ArrowDown),
                i.key_pressed(egui::Key::ArrowUp),
                i.modifiers.shift,
                i.modifiers.command && i.key_pressed(egui::Key::A),
                i.key_pressed(egui::Key::Escape),
            )
        });
        let selection = &mut self.controller.selection;
        if down {
            if shift {
                selection.extend_down(len);
            } else {
                selection.isolate_down(len);
            }
        }
        if up {
            if shift {
                selection.extend_up(len);
            } else {
                selection.isolate_up(len);
            }
        }
        if select_all {
            selection.select_all(len);
        }
        if escape {
            selection.clear();
        }
        if down || up || select_all || escape {
            self.refresh_status_line();
        }
    }

    fn selected_ids(&self) -> Vec<ItemId> {
        self.controller
            .selection
            .positions()
            .into_iter()
            .filter_map(|pos| self.controller.item_at(pos))
            .collect()
    }

    fn edit_tags_on_selection(&mut self, insert: bool) {
        let ids = self.selected_ids();
        let tags: Vec<String> = self
            .tag_input
            .split_whitespace()
            .map(ToString::to_string)
            .collect();
        if ids.is_empty() || tags.is_empty() {
            self.set_notice("Select rows and type a tag first");
            return;
        }
        if self
            .tag_tx
            .send(TagEditRequest { ids, tags, insert })
            .is_err()
        {
            self.set_notice("Tag worker is unavailable");
        }
    }

    fn request_visible_details(&mut self, window: std::ops::Range<usize>) {
        for position in window {
            let Some(id) = self.controller.item_at(position) else {
                continue;
            };
            if self.controller.cache.begin_fetch(id) && self.details_tx.send(id).is_err() {
                self.controller.cache.fetch_failed(id);
            }
        }
    }

    fn focused_details(&self) -> Option<(ItemId, Option<&ItemDetails>)> {
        let position = self.controller.selection.focused()?;
        let id = self.controller.item_at(position)?;
        Some((id, self.controller.cache.lookup(id)))
    }

    fn row_label(&self, id: ItemId) -> String {
        match self.controller.cache.lookup(id) {
            Some(details) => {
                let rel = self
                    .controller
                    .path()
                    .and_then(|root| details.path.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| details.path.to_string_lossy().to_string());
                let mut text = format!("[{}] {}", details.file_type.label(), rel);
                if !details.tags.is_empty() {
                    let tags: Vec<&str> = details.tags.iter().map(String::as_str).collect();
                    text.push_str(&format!("  #{}", tags.join(" #")));
                }
                text
            }
            None => format!("{id} ..."),
        }
    }

    fn tick_debounce(&mut self) {
        if self.debouncer.fire() {
            let request = self.controller.set_query(self.query_input.clone());
            self.send_query_request(request);
        }
    }

    fn copy_selected_paths(&self, ctx: &egui::Context) {
        let lines: Vec<String> = self
            .selected_ids()
            .into_iter()
            .filter_map(|id| self.controller.cache.lookup(id))
            .map(|details| details.path.to_string_lossy().to_string())
            .collect();
        if !lines.is_empty() {
            ctx.output_mut(|o| o.copied_text = lines.join("\n"));
        }
    }

    fn show_results_list(&mut self, ui: &mut egui::Ui) {
        let count = self.controller.items().len();
        let mut clicked: Option<(usize, egui::Modifiers)> = None;

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show_viewport(ui, |ui, rect| {
                ui.set_height(ROW_HEIGHT * count as f32);
                let window = viewport::window(
                    rect.min.y,
                    rect.height(),
                    ROW_HEIGHT,
                    count,
                    ROW_HEIGHT * PRELOAD_ROWS,
                );
                self.request_visible_details(window.clone());

                let left = ui.min_rect().left();
                let top = ui.min_rect().top();
                let width = ui.available_width();
                for position in window {
                    let Some(id) = self.controller.item_at(position) else {
                        continue;
                    };
                    let row_rect = egui::Rect::from_min_size(
                        egui::pos2(left, top + position as f32 * ROW_HEIGHT),
                        egui::vec2(width, ROW_HEIGHT),
                    );
                    let selected = self.controller.selection.contains(position);
                    if selected {
                        ui.painter().rect_filled(
                            row_rect,
                            2.0,
                            ui.visuals().selection.bg_fill.linear_multiply(0.4),
                        );
                    }
                    let text = egui::RichText::new(self.row_label(id)).color(if selected {
                        ui.visuals().strong_text_color()
                    } else {
                        ui.visuals().text_color()
                    });
                    let response = ui.put(
                        row_rect,
                        egui::Label::new(text).extend().sense(egui::Sense::click()),
                    );
                    if response.clicked() {
                        let modifiers = ui.input(|i| i.modifiers);
                        clicked = Some((position, modifiers));
                    }
                }
            });

        if let Some((position, modifiers)) = clicked {
            self.handle_row_click(position, modifiers);
        }
    }

    fn show_detail_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Details");
        match self.focused_details() {
            Some((id, Some(details))) => {
                let path = details.path.to_string_lossy().to_string();
                let tags: Vec<&str> = details.tags.iter().map(String::as_str).collect();
                ui.label(format!("Item: {id}"));
                ui.label(format!("Type: {}", details.file_type.label()));
                ui.add(egui::Label::new(path).wrap());
                ui.label(if tags.is_empty() {
                    "Tags: (none)".to_string()
                } else {
                    format!("Tags: {}", tags.join(", "))
                });
            }
            Some((id, None)) => {
                ui.label(format!("Item: {id}"));
                ui.label("Loading details...");
            }
            None => {
                ui.label("Nothing selected");
            }
        }

        ui.separator();
        ui.label("Tags (space-separated):");
        ui.text_edit_singleline(&mut self.tag_input);
        ui.horizontal(|ui| {
            if ui.button("Add to selection").clicked() {
                self.edit_tags_on_selection(true);
            }
            if ui.button("Remove from selection").clicked() {
                self.edit_tags_on_selection(false);
            }
        });
    }

    fn show_top_panel(&mut self, ui: &mut egui::Ui) {
        let mut open_root: Option<PathBuf> = None;

        ui.horizontal(|ui| {
            ui.label("Root:");
            egui::ComboBox::from_id_source("saved-roots")
                .width(220.0)
                .selected_text(if self.root_input.is_empty() {
                    "(saved roots)".to_string()
                } else {
                    self.root_input.clone()
                })
                .show_ui(ui, |ui| {
                    for root in self.saved_roots.roots() {
                        let text = root.to_string_lossy().to_string();
                        let selected = self.controller.path() == Some(root);
                        if ui.selectable_label(selected, text).clicked() {
                            open_root = Some(root.clone());
                        }
                    }
                });
            ui.add(
                egui::TextEdit::singleline(&mut self.root_input)
                    .desired_width(260.0)
                    .hint_text("Path to repository root"),
            );
            if ui.button("Open").clicked() && !self.root_input.trim().is_empty() {
                open_root = Some(PathBuf::from(self.root_input.trim()));
            }
            if ui.button("Close").clicked() {
                self.request_close();
            }
            if ui.button("Save root").clicked() {
                if let Some(path) = self.controller.path().cloned() {
                    if self.saved_roots.add(path) {
                        self.saved_roots.save();
                        self.set_notice("Root saved");
                    }
                }
            }
            if ui.button("Forget root").clicked() {
                if let Some(path) = self.controller.path().cloned() {
                    if self.saved_roots.remove(&path) {
                        self.saved_roots.save();
                        self.set_notice("Root removed from saved list");
                    }
                }
            }
        });

        if let Some(root) = open_root {
            self.request_open(root);
        }

        ui.horizontal(|ui| {
            ui.label("Filter:");
            let invalid = self.controller.invalid_query();
            let mut edit = egui::TextEdit::singleline(&mut self.query_input)
                .desired_width(f32::INFINITY)
                .hint_text("tag !tag path:sub path:\"with spaces\"");
            if invalid {
                edit = edit.text_color(ui.visuals().error_fg_color);
            }
            if ui.add(edit).changed() {
                self.debouncer.touch();
                self.refresh_status_line();
            }
        });

        ui.horizontal(|ui| {
            if ui.button("Resync").clicked() {
                self.request_resync();
            }
            if ui.button("Full reload").clicked() {
                self.request_reload();
            }
            if ui.button("Clear selection").clicked() {
                self.controller.selection.clear();
                self.refresh_status_line();
            }
        });
    }
}

impl eframe::App for TagViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_scan_responses();
        self.poll_watch_responses();
        self.poll_query_responses();
        self.poll_details_responses();
        self.poll_tag_responses();
        self.tick_debounce();
        self.handle_shortcuts(ctx);

        let copy_requested = ctx.input(|i| {
            i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::C)
        });
        if copy_requested {
            self.copy_selected_paths(ctx);
        }

        if self.controller.query_in_flight() || self.outstanding_scans > 0 || self.debouncer.pending()
        {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            // Watcher batches arrive without user input; keep polling lazily.
            ctx.request_repaint_after(Duration::from_millis(500));
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            self.show_top_panel(ui);
        });

        egui::TopBottomPanel::bottom("status")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.add(egui::Label::new(&self.status_line).truncate());
            });

        egui::SidePanel::right("details")
            .default_width(320.0)
            .show(ctx, |ui| {
                self.show_detail_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_results_list(ui);
        });
    }
}
