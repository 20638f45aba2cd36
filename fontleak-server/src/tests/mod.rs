mod router_flow;
