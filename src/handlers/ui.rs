// src/handlers/ui.rs
//! Server-rendered screens. Each page is static HTML plus a small script that talks
//! to the JSON API and keeps the session in browser storage under the keys
//! `accountDetails`, `userId` (localStorage) and `systemPrompt` (sessionStorage).
use axum::{response::Html, routing::get, Router};

pub fn ui_routes() -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/login", get(login_page))
        .route("/register", get(register_page))
        .route("/account", get(profile_page))
        .route("/chat", get(chat_page))
}

const STYLE: &str = r#"
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f5f7fb; color: #1f2937; line-height: 1.5; }
    header { background: #0f766e; color: white; padding: 0.75rem 1.5rem; display: flex; justify-content: space-between; align-items: center; }
    header a { color: white; text-decoration: none; margin-left: 1rem; }
    main { max-width: 760px; margin: 2rem auto; padding: 0 1rem; }
    .card { background: white; border-radius: 10px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); padding: 1.5rem; margin-bottom: 1rem; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    input, select, textarea { width: 100%; padding: 0.6rem; border: 1px solid #d1d5db; border-radius: 6px; margin-top: 0.25rem; font-size: 1rem; }
    button { margin-top: 1rem; padding: 0.6rem 1.2rem; border: none; border-radius: 6px; background: #0f766e; color: white; font-size: 1rem; cursor: pointer; }
    button.secondary { background: #6b7280; }
    button:disabled { opacity: 0.6; cursor: wait; }
    .message { display: none; margin-top: 1rem; padding: 0.6rem; border-radius: 6px; background: #fee2e2; color: #991b1b; }
    .message.show { display: block; }
    .message.ok { background: #dcfce7; color: #166534; }
    .bubble { padding: 0.6rem 0.9rem; border-radius: 10px; margin: 0.4rem 0; max-width: 85%; white-space: pre-wrap; }
    .bubble.user { background: #ccfbf1; margin-left: auto; }
    .bubble.assistant { background: #f3f4f6; }
    .bubble time { display: block; font-size: 0.75rem; color: #6b7280; }
    #messages { min-height: 300px; max-height: 55vh; overflow-y: auto; }
    .row { display: flex; gap: 0.5rem; align-items: center; }
    .saved button { display: block; width: 100%; text-align: left; background: #e5e7eb; color: #111827; margin-top: 0.4rem; }
"#;

// Shared client helpers: storage keys, the 3-second status window and logout.
const COMMON_SCRIPT: &str = r#"
    const KEYS = { account: 'accountDetails', userId: 'userId', prompt: 'systemPrompt' };
    function account() {
        try { return JSON.parse(localStorage.getItem(KEYS.account)); } catch (e) { return null; }
    }
    function authHeaders() {
        const details = account();
        const headers = { 'Content-Type': 'application/json' };
        if (details && details.token) headers['Authorization'] = 'Bearer ' + details.token;
        return headers;
    }
    function flash(text, ok) {
        const box = document.getElementById('status');
        if (!box) return;
        box.textContent = text;
        box.className = 'message show' + (ok ? ' ok' : '');
        setTimeout(() => { box.className = 'message'; box.textContent = ''; }, 3000);
    }
    function logout() {
        localStorage.removeItem(KEYS.account);
        localStorage.removeItem(KEYS.userId);
        localStorage.removeItem(KEYS.prompt);
        sessionStorage.removeItem(KEYS.prompt);
        window.location.href = '/login';
    }
    async function readError(response) {
        try { const body = await response.json(); return body.message || body.detail || body.error || 'Request failed'; }
        catch (e) { return 'Request failed'; }
    }
"#;

fn page(title: &str, body: &str, script: &str) -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Health Companion</title>
    <style>{STYLE}</style>
</head>
<body>
    <header>
        <strong>Health Companion</strong>
        <nav><a href="/chat">Chat</a><a href="/account">Profile</a><a href="#" onclick="logout()">Log out</a></nav>
    </header>
    <main>{body}</main>
    <script>{COMMON_SCRIPT}{script}</script>
</body>
</html>"##
    ))
}

pub async fn landing_page() -> Html<String> {
    page(
        "Welcome",
        r#"<div class="card">
            <h1>The health companion platform and communication tool</h1>
            <p>Ask questions about your diagnosis, prescription and care plan in plain language.</p>
            <div class="row"><a href="/login"><button>Log in</button></a><a href="/register"><button class="secondary">Create account</button></a></div>
        </div>"#,
        r#"if (account()) { window.location.href = '/chat'; }"#,
    )
}

const CREDENTIALS_FORM: &str = r#"
        <label for="email">Email</label>
        <input id="email" type="email" autocomplete="username" required>
        <label for="password">Password</label>
        <input id="password" type="password" required>
        <button id="submit" type="submit">Continue</button>
        <div id="status" class="message"></div>
"#;

pub async fn login_page() -> Html<String> {
    let body = format!(
        r#"<div class="card"><h2>Log in</h2><form id="form">{CREDENTIALS_FORM}</form>
           <p>Don't have an account? <a href="/register">Sign up</a></p></div>"#
    );
    page(
        "Log in",
        &body,
        r#"
    localStorage.removeItem(KEYS.account);
    document.getElementById('form').addEventListener('submit', async (e) => {
        e.preventDefault();
        const button = document.getElementById('submit');
        if (button.disabled) return;
        button.disabled = true;
        try {
            const response = await fetch('/api/login', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ Email: document.getElementById('email').value, Password: document.getElementById('password').value })
            });
            if (response.status === 200) {
                const details = await response.json();
                localStorage.setItem(KEYS.account, JSON.stringify(details));
                localStorage.setItem(KEYS.userId, String(details.id));
                window.location.href = '/chat';
                return;
            }
            flash('Login failed');
        } catch (err) {
            console.error(err);
            flash('Login failed');
        } finally {
            button.disabled = false;
        }
    });
"#,
    )
}

pub async fn register_page() -> Html<String> {
    let body = format!(
        r#"<div class="card"><h2>Create account</h2><form id="form">{CREDENTIALS_FORM}</form>
           <p>Already registered? <a href="/login">Log in</a></p></div>"#
    );
    page(
        "Register",
        &body,
        r#"
    document.getElementById('form').addEventListener('submit', async (e) => {
        e.preventDefault();
        const button = document.getElementById('submit');
        if (button.disabled) return;
        button.disabled = true;
        try {
            const email = document.getElementById('email').value;
            const response = await fetch('/api/register', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ Email: email, Password: document.getElementById('password').value })
            });
            if (response.status === 201) {
                const created = await response.json();
                localStorage.setItem(KEYS.account, JSON.stringify({ id: created.id, email: created.email, token: created.token }));
                localStorage.setItem(KEYS.userId, String(created.id));
                window.location.href = '/account?fromSignup=true';
                return;
            }
            flash(await readError(response));
        } catch (err) {
            console.error(err);
            flash('Registration failed');
        } finally {
            button.disabled = false;
        }
    });
"#,
    )
}

pub async fn profile_page() -> Html<String> {
    page(
        "Profile",
        r#"<div class="card"><h2>Your profile</h2>
        <form id="form">
            <label for="Name">Name</label><input id="Name">
            <label for="Phone">Phone</label><input id="Phone">
            <label for="Diagnosis">Diagnosis</label><input id="Diagnosis">
            <label for="Prescription">Prescription</label><input id="Prescription">
            <label for="Appointment">Next appointment</label><input id="Appointment">
            <label for="Age">Age</label><input id="Age" type="number" min="0">
            <label for="Gender">Gender</label><input id="Gender">
            <label for="Ethnicity">Ethnicity</label><input id="Ethnicity">
            <label for="User_Group">User group</label>
            <select id="User_Group"><option value="patient">Patient</option><option value="carer">Carer</option><option value="clinician">Clinician</option></select>
            <label for="Notes">Notes</label><textarea id="Notes" rows="4"></textarea>
            <button id="submit" type="submit">Save</button>
            <div id="status" class="message"></div>
        </form></div>"#,
        r#"
    const details = account();
    if (!details) { window.location.href = '/login'; }
    const FIELDS = { Name: 'username', Phone: 'phone', Diagnosis: 'diagnosis', Prescription: 'prescription',
                     Appointment: 'appointment', Age: 'age', Gender: 'gender', Ethnicity: 'ethnicity',
                     User_Group: 'user_group', Notes: 'notes' };
    async function load() {
        const response = await fetch('/profile?id=' + encodeURIComponent(localStorage.getItem(KEYS.userId)), { headers: authHeaders() });
        if (response.status === 404) return;
        if (!response.ok) { flash(await readError(response)); return; }
        const profile = await response.json();
        for (const [input, field] of Object.entries(FIELDS)) {
            if (profile[field] !== null && profile[field] !== undefined) document.getElementById(input).value = profile[field];
        }
    }
    document.getElementById('form').addEventListener('submit', async (e) => {
        e.preventDefault();
        const button = document.getElementById('submit');
        button.disabled = true;
        const body = { Email: details.email };
        for (const input of Object.keys(FIELDS)) {
            const value = document.getElementById(input).value;
            if (value !== '') body[input] = input === 'Age' ? parseInt(value, 10) : value;
        }
        try {
            const response = await fetch('/api/update-details', { method: 'POST', headers: authHeaders(), body: JSON.stringify(body) });
            if (!response.ok) { flash(await readError(response)); return; }
            const saved = await response.json();
            Object.assign(details, { patient_name: saved.username, diagnosis: saved.diagnosis, prescription: saved.prescription,
                                     notes: saved.notes, phone_number: saved.phone, user_group: saved.user_group });
            localStorage.setItem(KEYS.account, JSON.stringify(details));
            sessionStorage.removeItem(KEYS.prompt);
            flash('Profile updated successfully!', true);
        } catch (err) {
            console.error(err);
            flash('Error updating profile. Please try again.');
        } finally {
            button.disabled = false;
        }
    });
    if (details) load();
"#,
    )
}

pub async fn chat_page() -> Html<String> {
    page(
        "Chat",
        r#"<div class="card">
            <div class="row">
                <select id="mode" style="width:auto"><option value="rag">RAG</option><option value="browser">Browser</option></select>
                <input id="urls" placeholder="URLs for browser mode, comma separated">
                <button class="secondary" id="new-chat" type="button">New chat</button>
            </div>
            <div id="messages"></div>
            <form id="form" class="row">
                <input id="query" placeholder="Ask about your health..." autocomplete="off">
                <button id="submit" type="submit">Send</button>
            </form>
            <div id="status" class="message"></div>
        </div>
        <div class="card saved"><h3>Saved chats</h3><div id="saved"></div></div>
        <div class="card"><h3>System prompt</h3>
            <textarea id="prompt" rows="8"></textarea>
            <button class="secondary" id="save-prompt" type="button">Save prompt</button>
        </div>"#,
        r#"
    if (!account()) { window.location.href = '/login'; }
    let sessionId = null;
    let messages = [];
    let saved = [];
    const hhmm = (d) => d.toTimeString().slice(0, 5);
    function render() {
        const box = document.getElementById('messages');
        box.innerHTML = '';
        for (const m of messages) {
            const div = document.createElement('div');
            div.className = 'bubble ' + m.sender;
            div.textContent = m.text;
            const time = document.createElement('time');
            time.textContent = m.time;
            div.appendChild(time);
            box.appendChild(div);
        }
        box.scrollTop = box.scrollHeight;
        const list = document.getElementById('saved');
        list.innerHTML = '';
        for (const chat of saved) {
            const b = document.createElement('button');
            b.textContent = chat.title;
            b.onclick = () => loadChat(chat.id);
            list.appendChild(b);
        }
    }
    function title() {
        const first = messages.find((m) => m.sender === 'user');
        if (!first) return 'New Chat';
        return first.text.length > 30 ? first.text.substring(0, 30) + '...' : first.text;
    }
    function snapshot() {
        if (messages.length === 0) return;
        saved.unshift({ id: Math.random().toString(36).substring(2, 9), title: title(), messages: messages, sessionId: sessionId });
    }
    function loadChat(id) {
        const chat = saved.find((c) => c.id === id);
        if (!chat) return;
        saved = saved.filter((c) => c.id !== id);
        snapshot();
        messages = chat.messages;
        sessionId = chat.sessionId;
        render();
    }
    document.getElementById('new-chat').onclick = () => { snapshot(); messages = []; sessionId = null; render(); };
    document.getElementById('form').addEventListener('submit', async (e) => {
        e.preventDefault();
        const input = document.getElementById('query');
        const text = input.value.trim();
        if (text === '') return;
        const button = document.getElementById('submit');
        button.disabled = true;
        messages.push({ sender: 'user', text: text, time: hhmm(new Date()) });
        input.value = '';
        render();
        const urls = document.getElementById('urls').value.split(',').map((u) => u.trim()).filter((u) => u);
        try {
            const response = await fetch('/api/chat', {
                method: 'POST',
                headers: authHeaders(),
                body: JSON.stringify({ query: text, mode: document.getElementById('mode').value, session_id: sessionId, urls: urls })
            });
            if (!response.ok) { flash(await readError(response)); return; }
            const reply = await response.json();
            sessionId = reply.session_id;
            messages.push({ sender: 'assistant', text: reply.answer, time: hhmm(new Date()) });
            render();
        } catch (err) {
            console.error(err);
            flash('The assistant could not be reached. Please resend your message.');
        } finally {
            button.disabled = false;
        }
    });
    async function loadPrompt() {
        let text = sessionStorage.getItem(KEYS.prompt);
        if (!text) {
            const response = await fetch('/api/system-prompt', { headers: authHeaders() });
            if (response.ok) {
                text = (await response.json()).system_prompt;
                sessionStorage.setItem(KEYS.prompt, text);
            }
        }
        document.getElementById('prompt').value = text || '';
    }
    document.getElementById('save-prompt').onclick = () => {
        sessionStorage.setItem(KEYS.prompt, document.getElementById('prompt').value);
        flash('System prompt saved', true);
    };
    loadPrompt();
    render();
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::test_support::{body_json, empty_request, json_request, test_state};
    use axum::http::{header, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_pages_reference_storage_keys_and_endpoints() {
        let login = login_page().await.0;
        assert!(login.contains("/api/login"));
        assert!(login.contains("accountDetails"));

        let chat = chat_page().await.0;
        assert!(chat.contains("/api/chat"));
        assert!(chat.contains("session_id: sessionId"));

        let profile = profile_page().await.0;
        assert!(profile.contains("/api/update-details"));
        assert!(profile.contains("User_Group"));
    }

    #[tokio::test]
    async fn test_profile_page_and_profile_api_share_the_router() {
        let state = test_state(None);

        let response = build_router(state.clone())
            .oneshot(empty_request("GET", "/account", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"<a href="/account">Profile</a>"#));
        assert!(html.contains("fetch('/profile?id='"));

        let response = build_router(state.clone())
            .oneshot(json_request(
                "POST",
                "/api/register",
                None,
                json!({"Email": "page@example.com", "Password": "secret-pass"}),
            ))
            .await
            .unwrap();
        let registered = body_json(response).await;
        let id = registered["id"].as_i64().unwrap();
        let token = registered["token"].as_str().unwrap();

        let response = build_router(state.clone())
            .oneshot(json_request(
                "PUT",
                "/profile",
                Some(token),
                json!({"id": id, "username": "Page"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "Page");

        let response = build_router(state)
            .oneshot(empty_request("GET", &format!("/profile?id={id}"), Some(token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["username"], "Page");
    }
}
