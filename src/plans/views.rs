use crate::plans::models::plan::{Plan, SetupIntent};

pub const FLASH_SUBSCRIBED: &str = "Subscription purchased successfully!";

/// Minimal HTML escaping for text interpolated into markup.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

/// Plan listing with an optional one-shot flash message above the cards.
pub fn plans_page(plans: &[Plan], flash: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(message) = flash {
        body.push_str(&format!(
            "<div class=\"alert alert-success\" role=\"alert\">{}</div>\n",
            escape(message)
        ));
    }

    body.push_str("<h1>Plans</h1>\n");
    for plan in plans {
        body.push_str(&format!(
            "<div class=\"card\">\n<h2>{}</h2>\n<p>Price: ${}</p>\n<a href=\"/plans/{}\">Subscribe</a>\n</div>\n",
            escape(&plan.name),
            plan.display_price(),
            escape(&plan.slug)
        ));
    }

    layout("Plans", &body)
}

/// Checkout page for a single plan. The inline script collects card
/// details through Stripe Elements, confirms the setup intent and only
/// then submits the form with the resulting payment method id.
pub fn checkout_page(plan: &Plan, intent: &SetupIntent, public_key: &str) -> String {
    let body = format!(
        r#"<h1>Subscribe to {name}</h1>
<p>Price: ${price} / month</p>
<form id="subscription-form" method="POST" action="/subscription">
<input type="hidden" name="plan" value="{plan_id}">
<input type="hidden" name="payment_method" id="payment-method">
<div id="card-element"></div>
<div id="card-errors" role="alert"></div>
<button id="card-button" type="submit">Subscribe</button>
</form>
<script src="https://js.stripe.com/v3/"></script>
<script>
const stripe = Stripe('{public_key}');
const elements = stripe.elements();
const cardElement = elements.create('card');
cardElement.mount('#card-element');

const form = document.getElementById('subscription-form');
const cardButton = document.getElementById('card-button');

form.addEventListener('submit', async (event) => {{
    event.preventDefault();
    cardButton.disabled = true;
    const {{ setupIntent, error }} = await stripe.confirmCardSetup(
        '{client_secret}',
        {{ payment_method: {{ card: cardElement }} }}
    );
    if (error) {{
        document.getElementById('card-errors').textContent = error.message;
        cardButton.disabled = false;
    }} else {{
        document.getElementById('payment-method').value = setupIntent.payment_method;
        form.submit();
    }}
}});
</script>
"#,
        name = escape(&plan.name),
        price = plan.display_price(),
        plan_id = plan.id,
        public_key = escape(public_key),
        client_secret = escape(&intent.client_secret),
    );

    layout("Checkout", &body)
}
