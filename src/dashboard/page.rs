use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Music Bot Dashboard</title>
<style>
  body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; background: #2c2f33; color: #fff; }
  h1, h2, h3 { color: #7289da; }
  .container { background: #23272a; border-radius: 8px; padding: 20px; margin-bottom: 20px; }
  .controls { display: flex; flex-wrap: wrap; gap: 10px; margin-bottom: 20px; }
  button { background: #7289da; color: #fff; border: none; padding: 10px 15px; border-radius: 4px; cursor: pointer; }
  button:hover { background: #5b6eae; }
  button.active { background: #43b581; }
  .queue-item { display: flex; justify-content: space-between; padding: 8px; border-bottom: 1px solid #40444b; }
  .badge { display: inline-block; padding: 3px 8px; border-radius: 12px; font-size: 0.8em; }
  .ok { background: #43b581; } .warn { background: #faa61a; } .info { background: #7289da; } .bad { background: #f04747; }
  #volume-slider { width: 100%; }
  textarea { width: 100%; min-height: 80px; margin-bottom: 10px; background: #40444b; color: #fff; border: 1px solid #7289da; border-radius: 4px; padding: 8px; }
</style>
</head>
<body>
<h1>Discord Music Bot Dashboard</h1>
<div class="container">
  <div id="status"><h2>Not Playing</h2><p>Use /play to start music</p></div>
  <div class="controls">
    <button onclick="control('pause')">Pause</button>
    <button onclick="control('resume')">Resume</button>
    <button onclick="control('skip')">Skip</button>
    <button onclick="control('stop')">Stop</button>
  </div>
  <h3>Volume</h3>
  <input type="range" id="volume-slider" min="0" max="100" value="50" onchange="setVolume(this.value)">
  <span id="volume-value">50%</span>
  <h3>Loop Mode</h3>
  <button id="loop-off" onclick="setLoopMode('off')">Off</button>
  <button id="loop-track" onclick="setLoopMode('track')">Track</button>
  <button id="loop-queue" onclick="setLoopMode('queue')">Queue</button>
</div>
<div class="container"><h2>Queue</h2><div id="queue-container"><h3>Queue is empty</h3></div></div>
<div class="container"><h2>Radio</h2><div id="radio-container"><p>No radio sessions</p></div></div>
<div class="container">
  <h2>YouTube Cookies</h2>
  <p>If playback fails with "Sign in to confirm you're not a bot", paste fresh YouTube cookies here (name=value; name=value).</p>
  <textarea id="cookies-input" placeholder="VISITOR_INFO1_LIVE=value; CONSENT=value"></textarea>
  <button onclick="updateCookies()">Update Cookies</button>
</div>
<div class="container">
  <h2>System Status</h2>
  <p>yt-dlp: <span id="backend-status">Checking...</span></p>
  <p>Connection: <span id="connection-status">Disconnected</span></p>
</div>
<script>
  let currentGuildId = null;
  const proto = location.protocol === "https:" ? "wss://" : "ws://";
  const ws = new WebSocket(proto + location.host + "/ws");
  ws.onopen = () => ws.send(JSON.stringify({ type: "getStatus" }));
  ws.onmessage = (event) => render(JSON.parse(event.data));
  setInterval(() => { if (ws.readyState === WebSocket.OPEN) ws.send(JSON.stringify({ type: "getStatus" })); }, 5000);

  function esc(s) { const d = document.createElement("div"); d.textContent = s == null ? "" : String(s); return d.innerHTML; }

  function render(data) {
    currentGuildId = data.activeGuildId;
    const t = data.currentTrack;
    document.getElementById("status").innerHTML = t
      ? "<h2>Now Playing</h2><h3>" + esc(t.title) + "</h3><p>by " + esc(t.author) + " &bull; " + esc(t.durationDisplay || "Live") + "</p>" +
        "<p>Status: " + (data.isPlaying ? '<span class="badge ok">Playing</span>' : '<span class="badge warn">Paused</span>') +
        ' Loop: <span class="badge info">' + esc(data.loopMode).toUpperCase() + "</span></p>"
      : "<h2>Not Playing</h2><p>Use /play to start music</p>";

    const up = data.upcoming || [];
    document.getElementById("queue-container").innerHTML = up.length
      ? "<h3>" + up.length + " songs</h3>" + up.map((s, i) => '<div class="queue-item"><div>' + (i + 1) + ". " + esc(s.title) + "</div><div>" + esc(s.durationDisplay || "") + "</div></div>").join("")
      : "<h3>Queue is empty</h3>";

    const radios = Object.entries(data.radioSessions || {});
    document.getElementById("radio-container").innerHTML = radios.length
      ? radios.map(([g, r]) => "<p>" + esc(r.label) + ' <span class="badge info">' + esc(g) + "</span></p>").join("")
      : "<p>No radio sessions</p>";

    document.getElementById("volume-slider").value = data.volume;
    document.getElementById("volume-value").textContent = data.volume + "%";
    for (const m of ["off", "track", "queue"]) document.getElementById("loop-" + m).className = data.loopMode === m ? "active" : "";
    document.getElementById("backend-status").textContent = data.backendStatus === "configured" ? "Configured" : data.backendStatus === "missing" ? "Missing" : "Unknown";
    document.getElementById("connection-status").textContent = data.connectionStatus === "connected" ? "Connected" : "Disconnected";
  }

  async function post(path, body) {
    const res = await fetch(path, { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify(body) });
    const result = await res.json();
    if (!result.success) alert("Error: " + result.message);
    return result;
  }

  function control(action) {
    if (!currentGuildId) { alert("No active music session"); return; }
    post("/control", { action, guildId: currentGuildId });
  }
  function setVolume(volume) {
    document.getElementById("volume-value").textContent = volume + "%";
    if (currentGuildId) post("/volume", { volume: Number(volume), guildId: currentGuildId });
  }
  function setLoopMode(mode) {
    if (!currentGuildId) { alert("No active music session"); return; }
    post("/loop", { mode, guildId: currentGuildId });
  }
  async function updateCookies() {
    const cookies = document.getElementById("cookies-input").value.trim();
    if (!cookies) { alert("Please enter cookies"); return; }
    const result = await post("/update-cookies", { cookies });
    if (result.success) { alert(result.message || "Cookies updated"); document.getElementById("cookies-input").value = ""; }
  }
</script>
</body>
</html>
"#;
